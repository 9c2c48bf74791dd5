//! Forge - self-hosted Git forge backend
//!
//! A small HTTP/1.1 server over raw TCP sockets: one request per
//! connection, a pattern router with a session-cookie gate, and JSON
//! handlers for repositories, issues and pull requests.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod store;
