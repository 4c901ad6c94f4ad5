//! # fsrv-server: request handling for the fsrv file server
//!
//! ```text
//! Server::run ── accept ──► FixedPool<TcpStream> ──► FileService::handle_connection
//!                                                        ├─ GET  → stream file, GET record
//!                                                        ├─ PUT  → receive body, PUT trail
//!                                                        └─ else → 400, failure record
//! ```
//!
//! Each connection carries exactly one request and is closed when its
//! handler returns.

pub mod response;
pub mod service;
pub mod server;

mod get;
mod put;

#[cfg(test)]
mod tests;

pub use response::{payload_header, status_response, Status};
pub use server::{Server, Stopper};
pub use service::{FileService, TransferAborted};
