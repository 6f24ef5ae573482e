use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use tracing::debug;
use super::file_system::{mime_type, stream_length};
use super::listing::ListingError;

pub const HTTP_VERSION: &str = "HTTP/1.0";
pub const SERVER_NAME: &str = concat!("rust-static-server/", env!("CARGO_PKG_VERSION"));
pub const CHUNK_SIZE: usize = 4096;

const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by peer")]
    PeerClosed,
    #[error("unknown mime type for {}", .0.display())]
    UnknownMimeType(PathBuf),
    #[error("listing aborted: {0}")]
    Listing(#[from] ListingError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Ok,
    Found,
    BadRequest,
    Forbidden,
    NotFound,
    NotImplemented,
}

impl Status {
    pub fn code(&self) -> u16 {
        match *self {
            Status::Ok => 200,
            Status::Found => 302,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::NotImplemented => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::Found => "Found",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::NotImplemented => "Not Implemented",
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Delivery {
    Complete,
    PeerClosed,
}

/// Writes all of `buf`, retrying short writes and interrupted calls. A zero
/// length write means the peer went away and ends the attempt without error.
pub fn write_fully<W: Write + ?Sized>(out: &mut W, mut buf: &[u8]) -> io::Result<Delivery> {
    while !buf.is_empty() {
        match out.write(buf) {
            Ok(0) => return Ok(Delivery::PeerClosed),
            Ok(n) => buf = &buf[n..],
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Delivery::Complete)
}

fn deliver<W: Write + ?Sized>(out: &mut W, buf: &[u8]) -> Result<(), TransferError> {
    match write_fully(out, buf)? {
        Delivery::Complete => Ok(()),
        Delivery::PeerClosed => Err(TransferError::PeerClosed),
    }
}

pub fn http_date(time: DateTime<Utc>) -> String {
    time.format(RFC1123_FORMAT).to_string()
}

fn head(status: Status, content_type: &str, content_length: u64, extra: &[(&str, &str)]) -> String {
    let mut head = format!("{} {} {}\r\n", HTTP_VERSION, status.code(), status.reason());
    head.push_str(&format!("Server: {}\r\n", SERVER_NAME));
    head.push_str(&format!("Date: {}\r\n", http_date(Utc::now())));
    for (name, value) in extra {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("Content-Type: {}\r\n", content_type));
    head.push_str(&format!("Content-Length: {}\r\n", content_length));
    head.push_str("Connection: close\r\n\r\n");
    head
}

fn error_page(status: Status, message: &str) -> String {
    format!(
        "<html><head><title>{code} {reason}</title></head>\
         <body><h4>{code} {reason}</h4>{message}</body></html>",
        code = status.code(),
        reason = status.reason(),
        message = message
    )
}

fn send_page<W: Write + ?Sized>(out: &mut W, status: Status, message: &str, extra: &[(&str, &str)]) -> Result<(), TransferError> {
    let body = error_page(status, message);
    let mut response = head(status, "text/html", body.len() as u64, extra);
    response.push_str(&body);
    debug!("-> {} {}", status.code(), status.reason());
    deliver(out, response.as_bytes())
}

pub fn bad_request<W: Write + ?Sized>(out: &mut W) -> Result<(), TransferError> {
    send_page(out, Status::BadRequest, "Bad Request.", &[])
}

pub fn not_implemented<W: Write + ?Sized>(out: &mut W) -> Result<(), TransferError> {
    send_page(out, Status::NotImplemented, "Method is not supported.", &[])
}

pub fn not_found<W: Write + ?Sized>(out: &mut W) -> Result<(), TransferError> {
    send_page(out, Status::NotFound, "File not found.", &[])
}

pub fn found<W: Write + ?Sized>(out: &mut W, location: &str) -> Result<(), TransferError> {
    send_page(out, Status::Found, "Directories must end with a slash.", &[("Location", location)])
}

pub fn forbidden<W: Write + ?Sized>(out: &mut W) -> Result<(), TransferError> {
    send_page(out, Status::Forbidden, "Access denied.", &[])
}

/// Streams a regular file. Nothing is written when the MIME type is unknown.
pub fn send_file<W: Write + ?Sized>(out: &mut W, path: &Path) -> Result<(), TransferError> {
    let mut file = File::open(path)?;
    let length = stream_length(&mut file)?;
    let mime = mime_type(path).ok_or_else(|| TransferError::UnknownMimeType(path.to_path_buf()))?;

    deliver(out, head(Status::Ok, mime, length, &[]).as_bytes())?;
    copy_body(out, &mut file, length)?;
    debug!("-> 200 {} ({} bytes)", path.display(), length);
    Ok(())
}

/// Sends at most `length` bytes of `source`, so a file that grows while it
/// is being sent never overruns the advertised Content-Length.
fn copy_body<R: Read, W: Write + ?Sized>(out: &mut W, source: R, length: u64) -> Result<(), TransferError> {
    let mut source = source.take(length);
    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        deliver(out, &chunk[..n])?;
    }
}

pub fn send_listing<W: Write + ?Sized>(out: &mut W, page: &[u8]) -> Result<(), TransferError> {
    deliver(out, head(Status::Ok, "text/html", page.len() as u64, &[]).as_bytes())?;
    deliver(out, page)
}
