use std::fs;
use std::io::{self, ErrorKind, Write};
use std::os::unix::ffi::OsStrExt;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use super::buffer::{BufferError, GrowableBuffer};
use super::file_system::{find_index, is_readable};
use super::path::{encode_href, PathBuffer};
use super::response::{self, http_date, TransferError, SERVER_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("directory is not readable")]
    Forbidden,
    #[error("unable to read directory: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Serves `dir`: its `index.html` when present, otherwise a generated listing.
/// `title` is the decoded request path shown in the page heading.
pub fn serve_directory<W: Write + ?Sized>(out: &mut W, dir: &mut PathBuffer, title: &str) -> Result<(), TransferError> {
    if let Some(index) = find_index(dir) {
        if !is_readable(&index) {
            return response::forbidden(out);
        }
        return response::send_file(out, &index);
    }

    match list_directory(dir, title) {
        Ok(page) => response::send_listing(out, page.as_bytes()),
        Err(ListingError::Forbidden) => response::forbidden(out),
        Err(e) => Err(e.into()),
    }
}

/// Renders one table row per entry into a complete HTML page.
pub fn list_directory(dir: &mut PathBuffer, title: &str) -> Result<GrowableBuffer, ListingError> {
    let entries = fs::read_dir(dir.as_path()).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => ListingError::Forbidden,
        _ => ListingError::Io(e),
    })?;

    let mut rows = GrowableBuffer::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry in {}: {}", dir.as_path().display(), e);
                continue;
            }
        };
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }

        let metadata = match dir.with_child(&name, |p| fs::metadata(p)) {
            Ok(md) => md,
            Err(e) => {
                debug!("skipping {:?}: {}", name, e);
                continue;
            }
        };

        let mut display = name.as_bytes().to_vec();
        if metadata.is_dir() {
            display.push(b'/');
        }
        let size = if metadata.is_file() {
            format!("{} bytes", metadata.len())
        } else {
            String::new()
        };
        let modified = metadata
            .modified()
            .map(|time| http_date(DateTime::<Utc>::from(time)))
            .unwrap_or_default();

        rows.append_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
            encode_href(&display),
            escape_html(&String::from_utf8_lossy(&display)),
            modified,
            size
        ))?;
    }

    let title = escape_html(title);
    let mut page = GrowableBuffer::new();
    page.append_str(&format!(
        "<html><head><title>Index of {title}</title></head><body><h4>Index of {title}</h4>\
         <table cellspacing=\"8\"><tr><th>Name</th><th>Last Modified</th><th>Size</th></tr>",
        title = title
    ))?;
    page.append(rows.as_bytes())?;
    page.append_str(&format!("</table><hr><address>{}</address></body></html>", SERVER_NAME))?;
    Ok(page)
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
