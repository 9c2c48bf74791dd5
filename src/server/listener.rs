use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::App;
use crate::http::connection::Connection;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
    limiter: Arc<Semaphore>,
}

impl Server {
    /// Binds `server.listen_addr` and starts listening.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let app = App::new(AppState::in_memory(Config::default()))?;
    /// let server = Server::bind(app).await?;
    /// server.run().await?;
    /// ```
    pub async fn bind(app: App) -> anyhow::Result<Self> {
        let server_cfg = &app.state.config.server;

        let addr = tokio::net::lookup_host(&server_cfg.listen_addr)
            .await
            .with_context(|| format!("failed to resolve {}", server_cfg.listen_addr))?
            .next()
            .with_context(|| format!("{} resolved to no addresses", server_cfg.listen_addr))?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("failed to bind {addr}"))?;
        let listener = socket.listen(server_cfg.backlog)?;

        let limiter = Arc::new(Semaphore::new(server_cfg.max_connections));
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            app: Arc::new(app),
            limiter,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        let _sweeper = AbortOnDrop(spawn_session_sweeper(Arc::clone(&self.app)));

        loop {
            let permit = Arc::clone(&self.limiter)
                .acquire_owned()
                .await
                .context("connection limiter closed")?;

            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            tracing::debug!("Accepted connection from {}", peer);

            let app = Arc::clone(&self.app);
            tokio::spawn(async move {
                let conn = Connection::new(socket, peer, app);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {:#}", peer, e);
                }
                drop(permit);
            });
        }
    }
}

fn spawn_session_sweeper(app: Arc<App>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = app.state.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions removed");
            }
        }
    })
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
