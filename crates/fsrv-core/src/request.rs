//! Request head parser
//!
//! The server treats the first read from a connection as the complete
//! request head. Requests whose head is larger than one read, or that
//! arrive fragmented, are parsed from whatever that first read returned.
//! This is a known boundary limitation, not an error: the missing parts
//! simply do not contribute tokens.
//!
//! Parsing is token based, matching the subset of HTTP/1.1 the server
//! understands:
//!
//! ```text
//! PUT /AAAAAAAAAAAAAAAAAAAAAAAAAAA HTTP/1.1\r\n
//! Content-Length: 5\r\n
//! \r\n
//! ABCDE
//! ```
//!
//! - the first token is the method
//! - the token after `GET` or `PUT` is the resource (one leading `/` stripped)
//! - the token after `Content-Length:` is the declared body length
//!
//! Nothing else is validated.

use std::fmt;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH_TOKEN: &str = "Content-Length:";

/// Request method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    /// Anything else, kept verbatim for the audit log (empty if the request was empty)
    Other(String),
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "PUT" => Method::Put,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Other(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared body length, selecting the PUT framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLength {
    /// Header absent or unparseable: read until a short read
    Unspecified,
    /// Exact body length (`Known(0)` means an empty body)
    Known(u64),
}

impl ContentLength {
    /// Wire/log representation: `-1` for unspecified
    pub fn as_i64(&self) -> i64 {
        match *self {
            ContentLength::Unspecified => -1,
            ContentLength::Known(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }

    fn parse(token: Option<&str>) -> Self {
        token
            .and_then(|t| t.parse::<u64>().ok())
            .map(ContentLength::Known)
            .unwrap_or(ContentLength::Unspecified)
    }
}

impl fmt::Display for ContentLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Parsed request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Resource token, `None` if the request line had no target
    pub resource: Option<String>,
    pub content_length: ContentLength,
    /// Index just past the first `\r\n\r\n`, if the head was terminated
    /// within the bytes given to the parser
    pub body_offset: Option<usize>,
}

impl Request {
    /// Resource as a string, empty when absent
    pub fn resource_str(&self) -> &str {
        self.resource.as_deref().unwrap_or("")
    }
}

/// Parse the first chunk read from a connection.
pub fn parse_request(buf: &[u8]) -> Request {
    let body_offset = buf
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|p| p + HEAD_TERMINATOR.len());

    let head = match body_offset {
        Some(end) => &buf[..end],
        None => buf,
    };
    let text = String::from_utf8_lossy(head);

    let mut method = None;
    let mut resource = None;
    let mut content_length = ContentLength::Unspecified;

    for line in text.split(['\r', '\n']).filter(|l| !l.is_empty()) {
        let mut tokens = line.split_ascii_whitespace();
        while let Some(token) = tokens.next() {
            if method.is_none() {
                method = Some(Method::from_token(token));
            }
            match token {
                "GET" | "PUT" => {
                    resource = tokens.next().map(strip_leading_slash);
                }
                CONTENT_LENGTH_TOKEN => {
                    content_length = ContentLength::parse(tokens.next());
                }
                _ => {}
            }
        }
    }

    Request {
        method: method.unwrap_or_else(|| Method::Other(String::new())),
        resource,
        content_length,
        body_offset,
    }
}

fn strip_leading_slash(target: &str) -> String {
    target.strip_prefix('/').unwrap_or(target).to_string()
}

// ============================================================================
// Tests
// ============================================================================
