//! Status lines and response framing.

/// Statuses the server can answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

/// Complete response carrying a short text body.
///
/// The body is terminated by CRLF, and the CRLF is counted in
/// `Content-Length`.
pub fn status_response(status: Status, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}\r\n",
        status.code(),
        status.reason(),
        body.len() + 2,
        body
    )
    .into_bytes()
}

/// Head of a GET response; the raw file bytes follow.
pub fn payload_header(content_length: u64) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: {}\r\n\
         \r\n",
        content_length
    )
    .into_bytes()
}
