//! Per-PUT audit trail: header, one hex-dump segment per received chunk,
//! then the footer.
//!
//! Every segment is its own reservation, so segments of concurrent PUTs may
//! interleave in the file. Within one PUT they land in program order
//! because a single worker emits them sequentially.

use fsrv_core::ContentLength;

use crate::record::Record;
use crate::writer::AuditLog;

pub struct PutTrail<'a> {
    log: &'a AuditLog,
    /// Payload bytes dumped so far; the running index of the next line
    logged: u64,
}

impl<'a> PutTrail<'a> {
    /// Append the PUT header and start a trail.
    pub fn begin(log: &'a AuditLog, resource: &str, content_length: ContentLength) -> Self {
        log.append(&Record::PutHeader {
            resource,
            content_length,
        });
        Self { log, logged: 0 }
    }

    /// Dump one received chunk.
    pub fn chunk(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.log.append(&Record::Payload {
            logged: self.logged,
            chunk: bytes,
        });
        self.logged += bytes.len() as u64;
    }

    pub fn logged(&self) -> u64 {
        self.logged
    }

    /// Close the record. A trail dropped without `finish` (aborted
    /// transfer) leaves no footer.
    pub fn finish(self) {
        self.log.append(&Record::Footer);
    }
}
