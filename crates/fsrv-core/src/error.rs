//! Error types for fsrv
//!
//! Request-level failures never surface here: handlers resolve them
//! locally by answering the client or dropping the connection. These
//! errors cover startup and configuration, where failing is fatal.

use std::io;
use std::path::PathBuf;

/// Result type for fsrv operations
pub type Result<T> = std::result::Result<T, FsrvError>;

/// Errors that stop the server from starting or running
#[derive(Debug, thiserror::Error)]
pub enum FsrvError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration rejected by `ServerConfig::validate`
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Audit log name collides with a daemonize output file
    #[error("{0} is a reserved filename, please name the log differently")]
    ReservedLogName(String),

    /// Audit log could not be opened
    #[error("cannot open audit log {path}: {source}")]
    AuditLogOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Host/port did not resolve to a usable address
    #[error("cannot resolve {0}")]
    Resolve(String),

    /// Listening socket setup failed
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Worker threads could not be started
    #[error("failed to spawn worker threads: {0}")]
    Spawn(#[source] io::Error),
}
