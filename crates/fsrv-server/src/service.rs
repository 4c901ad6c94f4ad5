//! Per-connection dispatch.
//!
//! A worker hands each accepted stream to [`FileService::handle_connection`],
//! which reads the request head once, routes it to the GET or PUT handler,
//! and drops the stream when the handler returns. Every failure is resolved
//! here: the client gets a status response or a closed socket, the
//! operational log gets a line, and nothing propagates to the worker loop.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fsrv_audit::{AuditLog, Record};
use fsrv_core::{parse_request, Method, ServerConfig};
use nix::errno::Errno;
use tracing::{debug, info, warn};

use crate::response::{status_response, Status};

/// Why a transfer was abandoned without a response
#[derive(Debug, thiserror::Error)]
pub enum TransferAborted {
    #[error("client socket: {0}")]
    Client(#[source] io::Error),

    #[error("resource file: {0}")]
    File(#[source] io::Error),

    #[error("client closed after {received} of {expected} body bytes")]
    ShortBody { received: u64, expected: u64 },

    #[error("file ended after {sent} of {expected} bytes")]
    ShortFile { sent: u64, expected: u64 },
}

pub(crate) type Transfer = std::result::Result<(), TransferAborted>;

/// GET/PUT over a storage directory, audited to one shared log
pub struct FileService {
    root: PathBuf,
    audit: AuditLog,
    buf_size: usize,
    recv_timeout: Duration,
}

impl FileService {
    pub fn new(config: &ServerConfig, audit: AuditLog) -> Self {
        Self {
            root: config.storage_dir.clone(),
            audit,
            buf_size: config.buf_size,
            recv_timeout: config.recv_timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub(crate) fn buf_size(&self) -> usize {
        self.buf_size
    }

    pub(crate) fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    /// Serve one request and close the connection.
    pub fn handle_connection(&self, worker_id: usize, mut stream: TcpStream) {
        // A silent client must not pin the worker forever.
        if let Err(e) = stream.set_read_timeout(Some(self.recv_timeout)) {
            warn!(worker_id, error = %e, "cannot set receive timeout");
        }

        let mut buf = vec![0u8; self.buf_size];
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                debug!(worker_id, "peer closed before sending a request");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!(worker_id, error = %e, "failed to read request");
                return;
            }
        };

        let request = parse_request(&buf[..n]);
        let resource = request.resource_str();
        let early_body = request.body_offset.map_or(&[][..], |start| &buf[start..n]);
        info!(
            worker_id,
            method = request.method.as_str(),
            resource,
            content_length = %request.content_length,
            "request"
        );

        let outcome = match &request.method {
            Method::Get => self.get(&mut stream, resource),
            Method::Put => self.put(&mut stream, resource, request.content_length, early_body),
            Method::Other(method) => self.refuse(
                &mut stream,
                method,
                resource,
                Status::BadRequest,
                "Unsupported method",
            ),
        };

        if let Err(e) = outcome {
            warn!(
                worker_id,
                method = request.method.as_str(),
                resource,
                error = %e,
                "transfer aborted"
            );
        }
    }

    /// Audit a refused request, then answer it.
    pub(crate) fn refuse(
        &self,
        stream: &mut TcpStream,
        method: &str,
        resource: &str,
        status: Status,
        body: &str,
    ) -> Transfer {
        self.audit.append(&Record::Failure {
            method,
            resource,
            status: status.code(),
        });
        respond(stream, status, body)
    }
}

pub(crate) fn respond(stream: &mut TcpStream, status: Status, body: &str) -> Transfer {
    stream
        .write_all(&status_response(status, body))
        .map_err(TransferAborted::Client)
}

/// The OS description of an error, without Rust's `(os error N)` suffix.
pub(crate) fn os_error_text(e: &io::Error) -> String {
    match e.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_string(),
        None => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_error_text() {
        let e = io::Error::from_raw_os_error(Errno::ENOENT as i32);
        assert_eq!(os_error_text(&e), "No such file or directory");

        let e = io::Error::new(io::ErrorKind::Other, "custom");
        assert_eq!(os_error_text(&e), "custom");
    }

    #[test]
    fn test_abort_messages() {
        let e = TransferAborted::ShortBody {
            received: 3,
            expected: 10,
        };
        assert_eq!(e.to_string(), "client closed after 3 of 10 body bytes");
    }
}
