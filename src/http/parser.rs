use crate::http::request::{Method, Request};
use std::collections::HashMap;
use thiserror::Error;

/// Hard cap on a request: the connection reads at most this many bytes once.
pub const MAX_REQUEST_SIZE: usize = 8192;

/// Longest verb we accept ("OPTIONS"). Longer first tokens are rejected
/// before any lookup.
pub const MAX_METHOD_LEN: usize = 7;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const COOKIE_PREFIX: &str = "Cookie: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("request exceeds {MAX_REQUEST_SIZE} bytes")]
    TooLarge,
    #[error("unknown or malformed method")]
    InvalidMethod,
    #[error("missing request path")]
    MissingPath,
    #[error("missing header terminator")]
    MissingHeaderTerminator,
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("malformed header line")]
    InvalidHeader,
}

/// Parses one complete HTTP request from `buf`.
///
/// The buffer must hold the whole head (request line, headers and the blank
/// line). Everything after the blank line becomes the body. No
/// `Content-Length` reconciliation is done: the connection reads once and
/// whatever arrived is the request.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }
    if buf.len() > MAX_REQUEST_SIZE {
        return Err(ParseError::TooLarge);
    }

    let method = parse_method(buf).ok_or(ParseError::InvalidMethod)?;

    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::MissingHeaderTerminator)?;
    let head = std::str::from_utf8(&buf[..headers_end])
        .map_err(|_| ParseError::InvalidEncoding)?;
    let body_bytes = &buf[headers_end + HEADER_TERMINATOR.len()..];

    let (request_line, header_block) = match head.split_once("\r\n") {
        Some((line, rest)) => (line, rest),
        None => (head, ""),
    };

    // "METHOD SP TARGET SP VERSION"
    let (_, after_method) = request_line
        .split_once(' ')
        .ok_or(ParseError::MissingPath)?;
    let (target, version) = after_method
        .split_once(' ')
        .ok_or(ParseError::MissingPath)?;
    if target.is_empty() {
        return Err(ParseError::MissingPath);
    }

    let (path, query) = match target.split_once('?') {
        Some((path, raw_query)) => (path, parse_query(raw_query)),
        None => (target, HashMap::new()),
    };
    if path.is_empty() {
        return Err(ParseError::MissingPath);
    }

    let headers = parse_headers(header_block)?;

    let body = if body_bytes.is_empty() {
        None
    } else {
        Some(body_bytes.to_vec())
    };

    Ok(Request {
        method,
        path: path.to_string(),
        query,
        version: version.to_string(),
        headers,
        body,
    })
}

/// Reads the method token at the start of `buf`.
///
/// Returns `None` for an empty buffer, a token that is longer than
/// [`MAX_METHOD_LEN`], a token not followed by a space, or a token that is
/// not one of the known (upper-case) verbs.
pub fn parse_method(buf: &[u8]) -> Option<Method> {
    let window = &buf[..buf.len().min(MAX_METHOD_LEN + 1)];
    let end = window.iter().position(|&b| b == b' ')?;
    if end == 0 {
        return None;
    }
    let token = std::str::from_utf8(&window[..end]).ok()?;
    Method::from_str(token)
}

/// Parses a raw query string into key/value pairs.
///
/// Pairs split on `&`, each pair on its first `=`. Keys and values are kept
/// verbatim (no percent-decoding). A pair without `=` maps to an empty value.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Scans raw header text for `Cookie: ` lines and returns the first value
/// whose name matches.
///
/// Stops at the blank line that ends the head.
pub fn parse_cookie<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split("\r\n")
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.strip_prefix(COOKIE_PREFIX))
        .find_map(|value| find_cookie(value, name))
}

/// Finds `name` inside a single `Cookie` header value. First pair wins.
pub fn find_cookie<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .split("; ")
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn parse_headers(block: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();

    for line in block.split("\r\n") {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(": ")
            .ok_or(ParseError::InvalidHeader)?;
        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        // Duplicates: last one wins.
        headers.insert(key.to_ascii_lowercase(), value.to_string());
    }

    Ok(headers)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}
