//! HTTP/1.1 over a raw TCP stream.
//!
//! Every connection carries exactly one request: the server reads once,
//! answers, and closes. There is no keep-alive and no pipelining.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: turns the bytes of a single read into a [`request::Request`]
//! - **`request`**: request representation and cookie/query accessors
//! - **`response`**: status codes and the response builder
//! - **`writer`**: serializes a response with `Content-Length` and `Connection: close`
//! - **`mime`**: content types by file extension
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← One read, bounded by size and timeout
//!        └──────┬──────┘
//!               │ Bytes received (none → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Parse, route, run the handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │
//!               ▼
//!            Closed
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
