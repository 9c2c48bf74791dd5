use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use anyhow::Context;

use crate::app::App;
use crate::error::ApiError;
use crate::http::parser::{MAX_REQUEST_SIZE, parse_http_request, parse_method};
use crate::http::request::Method;
use crate::http::response::Response;
use crate::http::writer::write_response;

/// One accepted client. Serves exactly one request, then closes.
///
/// The stream is owned here and dropped (closed) on every exit path,
/// including errors and a panicking handler.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    app: Arc<App>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(BytesMut),
    Writing { response: Response, head_only: bool },
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, app: Arc<App>) -> Self {
        Self {
            stream,
            peer,
            app,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await? {
                    Some(buf) => ConnectionState::Processing(buf),
                    None => ConnectionState::Closed,
                },

                ConnectionState::Processing(buf) => ConnectionState::Writing {
                    head_only: parse_method(&buf) == Some(Method::HEAD),
                    response: self.respond(&buf).await,
                },

                ConnectionState::Writing { response, head_only } => {
                    write_response(&mut self.stream, &response, head_only)
                        .await
                        .context("failed to write response")?;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        // Peer may already be gone.
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    /// Reads once into a fixed-size buffer. `None` means there is nothing to
    /// answer: the peer sent no bytes or never sent anything before the timeout.
    async fn read_request(&mut self) -> anyhow::Result<Option<BytesMut>> {
        let mut buf = BytesMut::with_capacity(MAX_REQUEST_SIZE);
        let read_timeout: Duration = self.app.state.config.server.read_timeout();

        let n = match timeout(read_timeout, self.stream.read_buf(&mut buf)).await {
            Ok(result) => result.context("failed to read request")?,
            Err(_) => {
                tracing::warn!(peer = %self.peer, "Timed out waiting for request");
                return Ok(None);
            }
        };

        if n == 0 {
            tracing::debug!(peer = %self.peer, "Connection closed before sending a request");
            return Ok(None);
        }

        buf.truncate(MAX_REQUEST_SIZE);
        Ok(Some(buf))
    }

    /// Parses and dispatches. Never fails: every error becomes a response.
    async fn respond(&self, buf: &[u8]) -> Response {
        let dev_mode = self.app.state.config.dev_mode;

        let request = match parse_http_request(buf) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "Malformed request");
                return ApiError::from(e).into_response(dev_mode);
            }
        };

        let method = request.method;
        let path = request.path.clone();

        // Handlers may block on collaborator I/O; a panic surfaces as a JoinError.
        let app = Arc::clone(&self.app);
        let response = match tokio::task::spawn_blocking(move || {
            app.router.dispatch(&request, &app.state)
        })
        .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    peer = %self.peer,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Handler panicked"
                );
                ApiError::internal(format!("handler panicked: {e}")).into_response(dev_mode)
            }
        };

        tracing::info!(
            peer = %self.peer,
            method = %method,
            path = %path,
            status = response.status.as_u16(),
            "Request handled"
        );

        response
    }
}
