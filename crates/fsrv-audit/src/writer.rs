//! `AuditLog`: the shared log writer.
//!
//! Owns the log file and the tail offset. The offset lives behind its own
//! mutex and is the only state that lock protects; the file descriptor is
//! shared unlocked because concurrent `pwrite`s into disjoint ranges do
//! not interfere.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::sys::uio::pwrite;
use tracing::warn;

use crate::record::Record;

/// A byte range of the log claimed by one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub offset: u64,
    pub len: u64,
}

impl Reservation {
    /// First byte past the range
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

struct Sink {
    file: File,
    /// Next unclaimed byte of the log
    tail: Mutex<u64>,
}

/// Append-only audit log. A disabled log accepts every call and does nothing.
pub struct AuditLog {
    sink: Option<Sink>,
}

impl AuditLog {
    /// A log that records nothing
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Create (or truncate) the log at `path`, mode 0644.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)?;
        Ok(Self::from_file(file))
    }

    /// Write into an already open file, starting at offset 0.
    pub fn from_file(file: File) -> Self {
        Self {
            sink: Some(Sink {
                file,
                tail: Mutex::new(0),
            }),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Total bytes reserved so far
    pub fn tail(&self) -> u64 {
        match &self.sink {
            Some(sink) => *sink.tail.lock().unwrap_or_else(PoisonError::into_inner),
            None => 0,
        }
    }

    /// Reserve `encoded_len` bytes for `record`, then format and write it
    /// outside the offset lock.
    ///
    /// Returns the claimed range, or `None` when logging is disabled or the
    /// record is empty.
    pub fn append(&self, record: &Record<'_>) -> Option<Reservation> {
        let sink = self.sink.as_ref()?;
        let len = record.encoded_len();
        if len == 0 {
            return None;
        }
        let reservation = sink.reserve(len as u64);

        let mut buf = Vec::with_capacity(len);
        record.encode_into(&mut buf);
        debug_assert_eq!(buf.len(), len, "record size mismatch for {:?}", record);

        sink.write_at(&buf, reservation.offset);
        Some(reservation)
    }

    /// Reserve exactly `bytes.len()` bytes and write `bytes` there.
    /// Returns the starting offset.
    pub fn reserve_and_write(&self, bytes: &[u8]) -> Option<u64> {
        let sink = self.sink.as_ref()?;
        let reservation = sink.reserve(bytes.len() as u64);
        sink.write_at(bytes, reservation.offset);
        Some(reservation.offset)
    }
}

impl Sink {
    fn reserve(&self, len: u64) -> Reservation {
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        let offset = *tail;
        *tail += len;
        Reservation { offset, len }
    }

    /// Failures are reported and swallowed; the range stays reserved.
    fn write_at(&self, bytes: &[u8], offset: u64) {
        if let Err(e) = pwrite_all(&self.file, bytes, offset) {
            warn!(offset, len = bytes.len(), "audit log write failed: {}", e);
        }
    }
}

fn pwrite_all(file: &File, mut bytes: &[u8], mut offset: u64) -> io::Result<()> {
    while !bytes.is_empty() {
        let pos = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "log offset overflow"))?;
        match pwrite(file, bytes, pos) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                bytes = &bytes[n..];
                offset += n as u64;
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fsrv_core::ContentLength;
    use std::sync::Arc;
    use std::thread;

    const NAME: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const SEPARATOR_BYTES: &[u8] = crate::record::SEPARATOR.as_bytes();

    #[test]
    fn test_disabled_is_noop() {
        let log = AuditLog::disabled();
        assert!(!log.is_enabled());
        assert_eq!(log.append(&Record::Get { resource: NAME }), None);
        assert_eq!(log.reserve_and_write(b"hello"), None);
        assert_eq!(log.tail(), 0);
    }

    #[test]
    fn test_sequential_records_tile_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::create(&path).unwrap();

        let a = log.append(&Record::Get { resource: NAME }).unwrap();
        let b = log
            .append(&Record::Failure {
                method: "GET",
                resource: "nope",
                status: 400,
            })
            .unwrap();
        assert_eq!(a, Reservation { offset: 0, len: 50 });
        assert_eq!(b.offset, a.end());
        assert_eq!(log.tail(), b.end());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            format!(
                "GET {} length 0\n========\nFAIL: GET nope HTTP/1.1 --- response 400\n========\n",
                NAME
            )
        );
        assert_eq!(text.len() as u64, log.tail());
    }

    #[test]
    fn test_reserve_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::create(&path).unwrap();

        assert_eq!(log.reserve_and_write(b"abc"), Some(0));
        assert_eq!(log.reserve_and_write(b"defg"), Some(3));
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdefg");
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        std::fs::write(&path, b"stale content from a previous run").unwrap();

        let log = AuditLog::create(&path).unwrap();
        log.append(&Record::Footer).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), SEPARATOR_BYTES);
    }

    #[test]
    fn test_concurrent_reservations_are_disjoint_and_gapless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = Arc::new(AuditLog::create(&path).unwrap());

        let threads = 8;
        let per_thread = 200;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    let payload = vec![t as u8; 37 + t];
                    let mut claimed = Vec::with_capacity(per_thread);
                    for i in 0..per_thread {
                        let record = match i % 3 {
                            0 => Record::Get { resource: NAME },
                            1 => Record::PutHeader {
                                resource: NAME,
                                content_length: ContentLength::Known(i as u64),
                            },
                            _ => Record::Payload {
                                logged: i as u64 * 1000,
                                chunk: &payload,
                            },
                        };
                        claimed.push(log.append(&record).unwrap());
                    }
                    claimed
                })
            })
            .collect();

        let mut ranges: Vec<Reservation> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ranges.sort_by_key(|r| r.offset);

        let mut expected = 0;
        for r in &ranges {
            assert_eq!(r.offset, expected, "gap or overlap at {}", r.offset);
            expected = r.end();
        }
        assert_eq!(expected, log.tail());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), log.tail());
    }
}
