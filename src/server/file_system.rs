use std::fs::{self, File};
use std::io::{self, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::warn;
use super::path::PathBuffer;

pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, thiserror::Error)]
#[error("unable to stat {path}: {source}")]
pub struct ClassifyError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Resolves decoded request paths against the served root.
pub struct FileSystemAdapter {
    root: PathBuf
}

impl FileSystemAdapter {
    pub fn new(root: &Path) -> FileSystemAdapter {
        FileSystemAdapter {
            root: root.to_path_buf()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, request_path: &[u8]) -> PathBuffer {
        PathBuffer::rooted(&self.root, request_path)
    }
}

/// Only a confirmed absence is `false`; any other stat failure is an error.
pub fn exists(path: &Path) -> Result<bool, ClassifyError> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound || e.kind() == ErrorKind::NotADirectory => Ok(false),
        Err(e) => {
            warn!("stat failed for {}: {}", path.display(), e);
            Err(ClassifyError { path: path.to_path_buf(), source: e })
        }
    }
}

pub fn is_directory(path: &Path) -> Result<bool, ClassifyError> {
    fs::metadata(path)
        .map(|md| md.is_dir())
        .map_err(|source| ClassifyError { path: path.to_path_buf(), source })
}

pub fn is_regular_file(path: &Path) -> Result<bool, ClassifyError> {
    fs::metadata(path)
        .map(|md| md.is_file())
        .map_err(|source| ClassifyError { path: path.to_path_buf(), source })
}

/// Asks the OS rather than reading permission bits, so ACLs and
/// capabilities are honoured.
pub fn is_readable(path: &Path) -> bool {
    File::open(path).is_ok()
}

/// Looks for a regular file literally named `index.html` and returns its
/// path. A directory of that name is not an index.
pub fn find_index(dir: &mut PathBuffer) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir.as_path()) {
        Ok(entries) => entries,
        Err(_) => return None
    };
    for entry in entries.flatten() {
        if entry.file_name() == INDEX_FILE {
            let index = dir.with_child(&entry.file_name(), |p| p.to_path_buf());
            return match is_regular_file(&index) {
                Ok(true) => Some(index),
                _ => None
            };
        }
    }
    None
}

/// Length of a seekable stream, leaving its position where it was.
pub fn stream_length<S: Seek>(stream: &mut S) -> io::Result<u64> {
    let saved = stream.seek(SeekFrom::Current(0))?;
    let length = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(saved))?;
    Ok(length)
}

pub fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    let mime = match ext {
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "png" => "image/png",
        "css" => "text/css",
        "au" => "audio/basic",
        "wav" => "audio/wav",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "txt" => "text/plain",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        _ => return None
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom};

    #[test]
    fn existing_and_missing_paths() {
        assert!(exists(Path::new("test_resources/index.html")).unwrap());
        assert!(!exists(Path::new("test_resources/missing.html")).unwrap());
    }

    #[test]
    fn path_under_a_file_is_absent() {
        assert!(!exists(Path::new("test_resources/index.html/child")).unwrap());
    }

    #[test]
    fn classifies_types() {
        assert!(is_directory(Path::new("test_resources/docs")).unwrap());
        assert!(!is_regular_file(Path::new("test_resources/docs")).unwrap());
        assert!(is_regular_file(Path::new("test_resources/index.html")).unwrap());
        assert!(!is_directory(Path::new("test_resources/index.html")).unwrap());
    }

    #[test]
    fn classify_missing_is_error() {
        assert!(is_directory(Path::new("test_resources/nope")).is_err());
    }

    #[test]
    fn readable_file() {
        assert!(is_readable(Path::new("test_resources/index.html")));
        assert!(!is_readable(Path::new("test_resources/missing.html")));
    }

    #[test]
    fn finds_index_only_where_present() {
        let adapter = FileSystemAdapter::new(Path::new("test_resources"));
        let mut site = adapter.resolve(b"/site/");
        assert_eq!(Some(PathBuf::from("test_resources/site/index.html")), find_index(&mut site));
        assert_eq!(b"test_resources/site/", site.as_bytes());

        let mut docs = adapter.resolve(b"/docs/");
        assert_eq!(None, find_index(&mut docs));
    }

    #[test]
    fn directory_named_index_is_not_an_index() {
        let adapter = FileSystemAdapter::new(Path::new("test_resources"));
        let mut odd = adapter.resolve(b"/odd/");
        assert_eq!(None, find_index(&mut odd));
        assert_eq!(b"test_resources/odd/", odd.as_bytes());
    }

    #[test]
    fn stream_length_restores_offset() {
        let mut cursor = Cursor::new(vec![0u8; 100]);
        cursor.seek(SeekFrom::Start(37)).unwrap();
        assert_eq!(100, stream_length(&mut cursor).unwrap());
        assert_eq!(37, cursor.position());
    }

    #[test]
    fn mime_table() {
        assert_eq!(Some("text/html"), mime_type(Path::new("a/index.html")));
        assert_eq!(Some("image/jpeg"), mime_type(Path::new("photo.jpeg")));
        assert_eq!(Some("text/plain"), mime_type(Path::new("readme.txt")));
        assert_eq!(None, mime_type(Path::new("data.bin")));
        assert_eq!(None, mime_type(Path::new("Makefile")));
    }
}
