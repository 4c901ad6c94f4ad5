//! Audit record sizing and formatting.
//!
//! `encoded_len` and `encode_into` are two independent renderings of the
//! same layout. The writer reserves `encoded_len` bytes and then writes
//! whatever `encode_into` produced into that range, so a disagreement
//! between them would shift every later record. Tests pin them together.

use fsrv_core::ContentLength;

/// Record separator; ends every GET, error and PUT record
pub const SEPARATOR: &str = "========\n";

/// Payload bytes per hex-dump line
pub const BYTES_PER_LINE: usize = 20;

/// Minimum digits of the running byte index on each hex-dump line
pub const INDEX_WIDTH: usize = 8;

const HEX: &[u8; 16] = b"0123456789abcdef";

const GET_PREFIX: &str = "GET ";
const PUT_PREFIX: &str = "PUT ";
const LENGTH_INFIX: &str = " length ";
const FAIL_PREFIX: &str = "FAIL: ";
const FAIL_INFIX: &str = " HTTP/1.1 --- response ";

/// One unit of audit output, reserved and written as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record<'a> {
    /// Successful GET, header line plus separator
    Get { resource: &'a str },
    /// First line of a PUT record
    PutHeader {
        resource: &'a str,
        content_length: ContentLength,
    },
    /// Hex dump of one received chunk; `logged` is the number of payload
    /// bytes of this PUT already dumped before the chunk
    Payload { logged: u64, chunk: &'a [u8] },
    /// Closes a PUT record
    Footer,
    /// Request that was answered with an error status
    Failure {
        method: &'a str,
        resource: &'a str,
        status: u16,
    },
}

impl Record<'_> {
    /// Exact number of bytes `encode_into` will produce.
    pub fn encoded_len(&self) -> usize {
        match *self {
            Record::Get { resource } => {
                GET_PREFIX.len() + resource.len() + LENGTH_INFIX.len() + 1 + 1 + SEPARATOR.len()
            }
            Record::PutHeader {
                resource,
                content_length,
            } => {
                PUT_PREFIX.len()
                    + resource.len()
                    + LENGTH_INFIX.len()
                    + signed_decimal_len(content_length.as_i64())
                    + 1
            }
            Record::Payload { logged, chunk } => hexdump_len(logged, chunk.len()),
            Record::Footer => SEPARATOR.len(),
            Record::Failure {
                method,
                resource,
                status,
            } => {
                FAIL_PREFIX.len()
                    + method.len()
                    + 1
                    + resource.len()
                    + FAIL_INFIX.len()
                    + decimal_len(u64::from(status))
                    + 1
                    + SEPARATOR.len()
            }
        }
    }

    /// Append the formatted record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Record::Get { resource } => {
                out.extend_from_slice(GET_PREFIX.as_bytes());
                out.extend_from_slice(resource.as_bytes());
                out.extend_from_slice(LENGTH_INFIX.as_bytes());
                out.extend_from_slice(b"0\n");
                out.extend_from_slice(SEPARATOR.as_bytes());
            }
            Record::PutHeader {
                resource,
                content_length,
            } => {
                out.extend_from_slice(PUT_PREFIX.as_bytes());
                out.extend_from_slice(resource.as_bytes());
                out.extend_from_slice(LENGTH_INFIX.as_bytes());
                out.extend_from_slice(content_length.as_i64().to_string().as_bytes());
                out.push(b'\n');
            }
            Record::Payload { logged, chunk } => encode_hexdump(logged, chunk, out),
            Record::Footer => out.extend_from_slice(SEPARATOR.as_bytes()),
            Record::Failure {
                method,
                resource,
                status,
            } => {
                out.extend_from_slice(FAIL_PREFIX.as_bytes());
                out.extend_from_slice(method.as_bytes());
                out.push(b' ');
                out.extend_from_slice(resource.as_bytes());
                out.extend_from_slice(FAIL_INFIX.as_bytes());
                push_decimal(out, u64::from(status), 1);
                out.push(b'\n');
                out.extend_from_slice(SEPARATOR.as_bytes());
            }
        }
    }

    /// Format into a freshly allocated buffer of exactly `encoded_len` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }
}

/// Number of decimal digits in `n` (1 for zero)
pub fn decimal_len(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn signed_decimal_len(n: i64) -> usize {
    let sign = usize::from(n < 0);
    sign + decimal_len(n.unsigned_abs())
}

/// Bytes occupied by the hex dump of `len` payload bytes whose first byte
/// has running index `logged`.
///
/// Each line is `<index> <hh> ... <hh>\n`: the index width, then three
/// bytes per payload byte (a separating space and two hex digits), then
/// the newline.
pub fn hexdump_len(logged: u64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let lines = len.div_ceil(BYTES_PER_LINE);
    let last_index = logged + ((lines - 1) * BYTES_PER_LINE) as u64;

    let index_bytes = if decimal_len(last_index) <= INDEX_WIDTH {
        lines * INDEX_WIDTH
    } else {
        // Indices past 99_999_999 outgrow the padding; size each line.
        (0..lines)
            .map(|i| index_width(logged + (i * BYTES_PER_LINE) as u64))
            .sum()
    };

    index_bytes + 3 * len + lines
}

#[inline]
fn index_width(index: u64) -> usize {
    decimal_len(index).max(INDEX_WIDTH)
}

fn encode_hexdump(logged: u64, chunk: &[u8], out: &mut Vec<u8>) {
    for (i, line) in chunk.chunks(BYTES_PER_LINE).enumerate() {
        push_decimal(out, logged + (i * BYTES_PER_LINE) as u64, INDEX_WIDTH);
        for &byte in line {
            out.push(b' ');
            out.push(HEX[usize::from(byte >> 4)]);
            out.push(HEX[usize::from(byte & 0x0f)]);
        }
        out.push(b'\n');
    }
}

/// Push `n` in decimal, left-padded with zeros to at least `width` digits.
fn push_decimal(out: &mut Vec<u8>, n: u64, width: usize) {
    let digits = decimal_len(n);
    out.extend(std::iter::repeat(b'0').take(width.saturating_sub(digits)));
    let start = out.len();
    let mut rest = n;
    for _ in 0..digits {
        out.push(b'0' + (rest % 10) as u8);
        rest /= 10;
    }
    out[start..].reverse();
}

// ============================================================================
// Tests
// ============================================================================
