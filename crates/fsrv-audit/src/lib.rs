//! # fsrv-audit: append-only audit log
//!
//! Every request outcome, and every byte of every PUT payload, is recorded
//! in a single shared log file. Many workers write into it at once without
//! serializing their disk I/O:
//!
//! 1. The exact byte length of a record is computed up front
//!    ([`Record::encoded_len`]). This is pure arithmetic over the record's
//!    fields and must agree with [`Record::encode_into`] byte for byte.
//! 2. Under the offset lock, the current tail is captured and advanced by
//!    that length. Nothing else happens under the lock.
//! 3. Outside the lock, the record is formatted and written with `pwrite`
//!    at the captured offset.
//!
//! Reserved ranges never overlap and tile the file from offset 0, so the
//! content of each record is exact even though concurrent records may reach
//! the disk in a different order than they were reserved in.
//!
//! ## Record shapes
//!
//! ```text
//! GET <name> length 0\n========\n
//! PUT <name> length <N>\n
//! 00000000 41 42 43 44 45\n           (one segment per received chunk)
//! ========\n                          (PUT footer)
//! FAIL: <method> <resource> HTTP/1.1 --- response <code>\n========\n
//! ```

pub mod record;
pub mod writer;
pub mod trail;

pub use record::{Record, BYTES_PER_LINE, INDEX_WIDTH, SEPARATOR};
pub use trail::PutTrail;
pub use writer::{AuditLog, Reservation};
