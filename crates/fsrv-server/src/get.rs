//! GET: stream a resource file back to the client.

use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;

use fsrv_audit::Record;
use fsrv_core::ResourceName;
use nix::unistd::{access, AccessFlags};
use tracing::debug;

use crate::response::{payload_header, Status};
use crate::service::{os_error_text, respond, FileService, Transfer, TransferAborted};

const METHOD: &str = "GET";

impl FileService {
    pub(crate) fn get(&self, stream: &mut TcpStream, raw: &str) -> Transfer {
        let name = match ResourceName::parse(raw) {
            Ok(name) => name,
            Err(e) => {
                debug!(resource = raw, error = %e, "rejecting GET");
                return self.refuse(stream, METHOD, raw, Status::BadRequest, "Invalid resource name");
            }
        };
        let path = name.path_in(self.root());

        if access(&path, AccessFlags::F_OK).is_err() {
            return respond(stream, Status::NotFound, "Resource not available");
        }
        if access(&path, AccessFlags::R_OK).is_err() {
            return self.refuse(stream, METHOD, name.as_str(), Status::Forbidden, "No permission to read");
        }

        let opened = File::open(&path).and_then(|file| {
            let size = file.metadata()?.len();
            Ok((file, size))
        });
        let (mut file, size) = match opened {
            Ok(opened) => opened,
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

        stream
            .write_all(&payload_header(size))
            .map_err(TransferAborted::Client)?;

        let mut buf = vec![0u8; self.buf_size()];
        let mut sent = 0u64;
        while sent < size {
            let want = (size - sent).min(buf.len() as u64) as usize;
            let n = file.read(&mut buf[..want]).map_err(TransferAborted::File)?;
            if n == 0 {
                return Err(TransferAborted::ShortFile {
                    sent,
                    expected: size,
                });
            }
            stream
                .write_all(&buf[..n])
                .map_err(TransferAborted::Client)?;
            sent += n as u64;
        }

        self.audit().append(&Record::Get {
            resource: name.as_str(),
        });
        Ok(())
    }
}
