//! TCP acceptor.
//!
//! Binds the configured address with an explicit backlog and hands every
//! accepted socket to its own [`Connection`](crate::http::connection::Connection)
//! task. A semaphore caps the number of connections served at once.

pub mod listener;

pub use listener::Server;
