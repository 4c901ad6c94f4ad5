//! PUT: receive a body into a resource file, dumping every received chunk
//! to the audit log before reading the next one.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::unix::fs::OpenOptionsExt;

use fsrv_audit::PutTrail;
use fsrv_core::{ContentLength, ResourceName};
use nix::unistd::{access, AccessFlags};
use tracing::{debug, warn};

use crate::response::Status;
use crate::service::{os_error_text, respond, FileService, Transfer, TransferAborted};

const METHOD: &str = "PUT";
const FILE_MODE: u32 = 0o644;

impl FileService {
    /// `early` holds body bytes that arrived together with the request head.
    pub(crate) fn put(
        &self,
        stream: &mut TcpStream,
        raw: &str,
        content_length: ContentLength,
        early: &[u8],
    ) -> Transfer {
        if let Err(e) = stream.set_read_timeout(Some(self.recv_timeout())) {
            warn!(error = %e, "cannot set receive timeout");
        }

        let name = match ResourceName::parse(raw) {
            Ok(name) => name,
            Err(e) => {
                debug!(resource = raw, error = %e, "rejecting PUT");
                return self.refuse(stream, METHOD, raw, Status::BadRequest, "Invalid resource name");
            }
        };
        let path = name.path_in(self.root());

        if access(&path, AccessFlags::F_OK).is_ok() && access(&path, AccessFlags::W_OK).is_err() {
            return self.refuse(stream, METHOD, name.as_str(), Status::Forbidden, "No permission to write");
        }

        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) => {
                let text = os_error_text(&e);
                return self.refuse(
                    stream,
                    METHOD,
                    name.as_str(),
                    Status::InternalServerError,
                    &text,
                );
            }
        };

        let mut trail = PutTrail::begin(self.audit(), name.as_str(), content_length);
        match content_length {
            ContentLength::Known(0) => {}
            ContentLength::Known(expected) => {
                self.receive_exact(stream, &mut file, &mut trail, expected, early)?
            }
            ContentLength::Unspecified => {
                self.receive_until_short(stream, &mut file, &mut trail, early)?
            }
        }
        trail.finish();

        respond(stream, Status::Created, name.as_str())
    }

    /// Read exactly `expected` body bytes; EOF first is a failed transfer.
    fn receive_exact(
        &self,
        stream: &mut TcpStream,
        file: &mut File,
        trail: &mut PutTrail<'_>,
        expected: u64,
        early: &[u8],
    ) -> Transfer {
        let limit = usize::try_from(expected).unwrap_or(usize::MAX);
        let head = &early[..early.len().min(limit)];
        store_chunk(file, trail, head)?;
        let mut received = head.len() as u64;

        let mut buf = vec![0u8; self.buf_size()];
        while received < expected {
            let want = (expected - received).min(buf.len() as u64) as usize;
            let n = stream
                .read(&mut buf[..want])
                .map_err(TransferAborted::Client)?;
            if n == 0 {
                return Err(TransferAborted::ShortBody { received, expected });
            }
            store_chunk(file, trail, &buf[..n])?;
            received += n as u64;
        }
        Ok(())
    }

    /// Read full buffers until one comes back short.
    fn receive_until_short(
        &self,
        stream: &mut TcpStream,
        file: &mut File,
        trail: &mut PutTrail<'_>,
        early: &[u8],
    ) -> Transfer {
        store_chunk(file, trail, early)?;

        let mut buf = vec![0u8; self.buf_size()];
        loop {
            let n = stream.read(&mut buf).map_err(TransferAborted::Client)?;
            store_chunk(file, trail, &buf[..n])?;
            if n < buf.len() {
                return Ok(());
            }
        }
    }
}

/// Write one chunk to the file, then dump it to the audit log.
fn store_chunk(file: &mut File, trail: &mut PutTrail<'_>, chunk: &[u8]) -> Transfer {
    if chunk.is_empty() {
        return Ok(());
    }
    file.write_all(chunk).map_err(TransferAborted::File)?;
    trail.chunk(chunk);
    Ok(())
}
