//! # fsrv-core
//!
//! Core types shared by every fsrv crate.
//!
//! This crate has no I/O of its own. Everything that touches sockets,
//! files or threads lives in `fsrv-audit`, `fsrv-pool` and `fsrv-server`.
//!
//! ## Modules
//!
//! - `resource` - 27-character resource names and their validation
//! - `request` - single-read request head parser (method, resource, Content-Length)
//! - `config` - server configuration with environment overrides
//! - `error` - error types
//! - `env` - environment variable utilities

pub mod resource;
pub mod request;
pub mod config;
pub mod error;
pub mod env;

// Re-exports for convenience
pub use resource::{ResourceError, ResourceName, RESOURCE_NAME_LEN};
pub use request::{parse_request, ContentLength, Method, Request};
pub use config::ServerConfig;
pub use error::{FsrvError, Result};
pub use env::{env_get, env_get_opt, env_get_str};

/// Constants shared across crates
pub mod constants {
    /// Default buffer size for the initial request read and for transfer chunks
    pub const DEFAULT_BUF_SIZE: usize = 8000;

    /// Default number of worker threads
    pub const DEFAULT_WORKERS: usize = 4;

    /// Default PUT receive timeout in seconds
    pub const DEFAULT_RECV_TIMEOUT_SECS: u64 = 5;

    /// Default listening port
    pub const DEFAULT_PORT: u16 = 80;

    /// Output files used when the server is daemonized by SIGHUP.
    /// The audit log may not use either name.
    pub const ACCESS_LOG_NAME: &str = "httpserver.access.log";
    pub const ERROR_LOG_NAME: &str = "httpserver.error.log";
}
