//! Server configuration
//!
//! Library defaults, overridden by environment variables, overridden by
//! whatever the caller sets through the builder (the CLI does this).
//!
//! ```rust,ignore
//! use fsrv_core::ServerConfig;
//!
//! let config = ServerConfig::from_env()
//!     .workers(8)
//!     .audit_log(Some("audit.log".into()));
//! config.validate()?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    ACCESS_LOG_NAME, DEFAULT_BUF_SIZE, DEFAULT_RECV_TIMEOUT_SECS, DEFAULT_WORKERS, ERROR_LOG_NAME,
};
use crate::env::{env_get, env_get_opt, env_get_str};
use crate::error::{FsrvError, Result};

/// Runtime configuration for the file server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Size of the initial request read and of every transfer chunk
    pub buf_size: usize,
    /// Receive timeout applied to PUT connections
    pub recv_timeout: Duration,
    /// Directory holding resource files
    pub storage_dir: PathBuf,
    /// Audit log destination; `None` disables audit logging
    pub audit_log: Option<PathBuf>,
    /// Operational log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            buf_size: DEFAULT_BUF_SIZE,
            recv_timeout: Duration::from_secs(DEFAULT_RECV_TIMEOUT_SECS),
            storage_dir: PathBuf::from("."),
            audit_log: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `FSRV_WORKERS` - Number of worker threads
    /// - `FSRV_BUF_SIZE` - Request/transfer buffer size in bytes
    /// - `FSRV_RECV_TIMEOUT_SECS` - PUT receive timeout in seconds
    /// - `FSRV_STORAGE_DIR` - Directory holding resource files
    /// - `FSRV_AUDIT_LOG` - Audit log path
    /// - `FSRV_LOG_LEVEL` - Operational log filter (`RUST_LOG` wins)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            workers: env_get("FSRV_WORKERS", defaults.workers),
            buf_size: env_get("FSRV_BUF_SIZE", defaults.buf_size),
            recv_timeout: Duration::from_secs(env_get(
                "FSRV_RECV_TIMEOUT_SECS",
                DEFAULT_RECV_TIMEOUT_SECS,
            )),
            storage_dir: env_get_opt::<String>("FSRV_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            audit_log: env_get_opt::<String>("FSRV_AUDIT_LOG").map(PathBuf::from),
            log_level: env_get_str("FSRV_LOG_LEVEL", &defaults.log_level),
        }
    }

    /// Set number of worker threads
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    /// Set request/transfer buffer size
    pub fn buf_size(mut self, n: usize) -> Self {
        self.buf_size = n;
        self
    }

    /// Set PUT receive timeout
    pub fn recv_timeout(mut self, d: Duration) -> Self {
        self.recv_timeout = d;
        self
    }

    /// Set storage directory
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set (or clear) the audit log path
    pub fn audit_log(mut self, path: Option<PathBuf>) -> Self {
        self.audit_log = path;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FsrvError::InvalidConfig(
                "at least one worker thread is needed to start the server",
            ));
        }
        if self.buf_size == 0 {
            return Err(FsrvError::InvalidConfig("buffer size must be at least 1"));
        }
        if self.recv_timeout.is_zero() {
            // A zero timeout is rejected by setsockopt.
            return Err(FsrvError::InvalidConfig("receive timeout must be non-zero"));
        }
        if let Some(path) = &self.audit_log {
            let reserved = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == ACCESS_LOG_NAME || n == ERROR_LOG_NAME);
            if reserved {
                return Err(FsrvError::ReservedLogName(path.display().to_string()));
            }
        }
        Ok(())
    }
}
