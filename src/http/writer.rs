use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a response: status line, headers, a computed `Content-Length`,
/// `Connection: close`, the blank line and the body.
///
/// Any `Content-Length` or `Connection` header set by a handler is ignored so
/// the framing always matches the bytes we send and the close we perform.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    serialize(resp, true)
}

/// Serialization for a `HEAD` request: the same head as for `GET`, including
/// the body's `Content-Length`, but no body bytes.
pub fn serialize_head_response(resp: &Response) -> Vec<u8> {
    serialize(resp, false)
}

fn serialize(resp: &Response, include_body: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        if k.eq_ignore_ascii_case("content-length") || k.eq_ignore_ascii_case("connection") {
            continue;
        }
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(format!("Content-Length: {}\r\n", resp.body.len()).as_bytes());
    buf.extend_from_slice(b"Connection: close\r\n");

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    if include_body {
        buf.extend_from_slice(&resp.body);
    }

    buf
}

/// Writes the whole serialized response in one `write_all` and flushes.
/// `head_only` answers a `HEAD` request.
pub async fn write_response<W>(
    stream: &mut W,
    response: &Response,
    head_only: bool,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = if head_only {
        serialize_head_response(response)
    } else {
        serialize_response(response)
    };
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}
