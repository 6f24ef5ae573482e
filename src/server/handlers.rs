use std::io::{BufRead, Read, Write};
use bufstream::BufStream;
use tracing::{debug, error, warn};
use super::file_system::{self, FileSystemAdapter};
use super::http::parse_request;
use super::listing::serve_directory;
use super::path::{decode_path, has_parent_segment};
use super::response::{self, TransferError};

pub const REQUEST_BUFSZ: usize = 4096;

/// Runs the whole request pipeline for one connection. Every failure is
/// contained here; the stream is closed when it is dropped.
pub fn handle_client<S: Read + Write>(stream: S, adapter: &FileSystemAdapter) {
    // no write buffering: every write goes straight to the socket so short
    // writes and a closed peer are visible to the flushing writer
    let mut buffed = BufStream::with_capacities(REQUEST_BUFSZ, 0, stream);

    match serve(&mut buffed, adapter) {
        Ok(()) => {}
        Err(TransferError::PeerClosed) => debug!("client closed the connection"),
        Err(e) => error!("request aborted: {}", e),
    }

    if let Err(e) = buffed.flush() {
        debug!("flush on close failed: {}", e);
    }
}

fn serve<S: Read + Write>(buffed: &mut BufStream<S>, adapter: &FileSystemAdapter) -> Result<(), TransferError> {
    let raw = buffed.fill_buf()?.to_vec();
    buffed.consume(raw.len());

    let request = match parse_request(&raw) {
        Ok(request) => request,
        Err(e) => {
            warn!("bad request: {}", e);
            return response::bad_request(buffed);
        }
    };
    let raw_path = String::from_utf8_lossy(&request.path).into_owned();
    debug!("{} {} {}", request.method, raw_path, request.version);

    if request.method != "GET" {
        return response::not_implemented(buffed);
    }

    let decoded = match decode_path(&request.path) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("bad request path {}: {}", raw_path, e);
            return response::bad_request(buffed);
        }
    };
    if !decoded.starts_with(b"/") {
        return response::bad_request(buffed);
    }
    if has_parent_segment(&decoded) {
        warn!("rejected path traversal: {}", raw_path);
        return response::forbidden(buffed);
    }

    let mut path = adapter.resolve(&decoded);
    match file_system::exists(path.as_path()) {
        Ok(true) => {}
        Ok(false) => return response::not_found(buffed),
        Err(_) => return response::forbidden(buffed),
    }

    let is_directory = match file_system::is_directory(path.as_path()) {
        Ok(is_directory) => is_directory,
        Err(e) => {
            warn!("{}", e);
            return response::forbidden(buffed);
        }
    };
    if is_directory {
        if !decoded.ends_with(b"/") {
            return response::found(buffed, &format!("{}/", raw_path));
        }
        let title = String::from_utf8_lossy(&decoded).into_owned();
        return serve_directory(buffed, &mut path, &title);
    }

    let is_file = file_system::is_regular_file(path.as_path()).unwrap_or(false);
    if !is_file || !file_system::is_readable(path.as_path()) {
        return response::forbidden(buffed);
    }
    response::send_file(buffed, path.as_path())
}
