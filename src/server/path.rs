use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("'%' at offset {0} is not followed by two characters")]
    TruncatedEscape(usize),
    #[error("'%' at offset {0} is not followed by two hex digits")]
    InvalidEscape(usize),
}

/// Percent-decodes a request path. Each `%XY` becomes the byte `0xXY`,
/// everything else is copied through.
pub fn decode_path(path: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::with_capacity(path.len());
    let mut i = 0;
    while i < path.len() {
        if path[i] != b'%' {
            decoded.push(path[i]);
            i += 1;
            continue;
        }
        if i + 2 >= path.len() {
            return Err(DecodeError::TruncatedEscape(i));
        }
        match (hex_value(path[i + 1]), hex_value(path[i + 2])) {
            (Some(high), Some(low)) => decoded.push(high << 4 | low),
            _ => return Err(DecodeError::InvalidEscape(i)),
        }
        i += 3;
    }
    Ok(decoded)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// True if any `/`-separated segment is `..`.
pub fn has_parent_segment(path: &[u8]) -> bool {
    path.split(|b| *b == b'/').any(|segment| segment == b"..")
}

/// Percent-encodes a single name for use in an href. Unreserved characters
/// pass through; a trailing `/` on directory names is kept.
pub fn encode_href(name: &[u8]) -> String {
    let mut encoded = String::with_capacity(name.len());
    for &b in name {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(b as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", b)),
        }
    }
    encoded
}

/// Mutable filesystem path, reused while enumerating a directory: children
/// are appended for the duration of a closure and truncated away afterwards.
#[derive(Debug)]
pub struct PathBuffer {
    bytes: Vec<u8>,
}

impl PathBuffer {
    /// Joins the server root and an absolute decoded request path.
    pub fn rooted(root: &Path, request_path: &[u8]) -> PathBuffer {
        let mut bytes = root.as_os_str().as_bytes().to_vec();
        while bytes.len() > 1 && bytes.ends_with(b"/") {
            bytes.pop();
        }
        // only the filesystem root is left ending in a slash
        let request_path = match request_path {
            [b'/', rest @ ..] if bytes.ends_with(b"/") => rest,
            _ => request_path,
        };
        bytes.extend_from_slice(request_path);
        PathBuffer { bytes }
    }

    pub fn as_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(&self.bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Runs `f` with `name` appended as a child of the current path. The
    /// buffer is restored to its previous length before returning.
    pub fn with_child<T, F>(&mut self, name: &OsStr, f: F) -> T
        where F: FnOnce(&Path) -> T {
        let mark = self.bytes.len();
        if !self.bytes.ends_with(b"/") {
            self.bytes.push(b'/');
        }
        self.bytes.extend_from_slice(name.as_bytes());
        let result = f(Path::new(OsStr::from_bytes(&self.bytes)));
        self.bytes.truncate(mark);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_is_unchanged() {
        let path = b"/docs/readme.txt";
        assert_eq!(path.to_vec(), decode_path(path).unwrap());
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(b"/a b/c.d".to_vec(), decode_path(b"/a%20b/c%2Ed").unwrap());
    }

    #[test]
    fn decodes_lowercase_hex() {
        assert_eq!(b"/~x".to_vec(), decode_path(b"/%7ex").unwrap());
    }

    #[test]
    fn decoded_percent_is_not_decoded_again() {
        assert_eq!(b"/%41".to_vec(), decode_path(b"/%2541").unwrap());
    }

    #[test]
    fn trailing_percent_is_rejected() {
        assert_eq!(Err(DecodeError::TruncatedEscape(2)), decode_path(b"/a%"));
        assert_eq!(Err(DecodeError::TruncatedEscape(2)), decode_path(b"/a%4"));
    }

    #[test]
    fn non_hex_escape_is_rejected() {
        assert_eq!(Err(DecodeError::InvalidEscape(1)), decode_path(b"/%zz"));
        assert_eq!(Err(DecodeError::InvalidEscape(1)), decode_path(b"/%4g/"));
    }

    #[test]
    fn detects_parent_segments() {
        assert!(has_parent_segment(b"/../etc/passwd"));
        assert!(has_parent_segment(b"/docs/.."));
        assert!(!has_parent_segment(b"/docs/..hidden"));
        assert!(!has_parent_segment(b"/docs/a..b/"));
    }

    #[test]
    fn encodes_href() {
        assert_eq!("hello%20world.txt", encode_href(b"hello world.txt"));
        assert_eq!("nested/", encode_href(b"nested/"));
        assert_eq!("a%26b%22", encode_href(b"a&b\""));
    }

    #[test]
    fn rooted_joins_without_double_slash() {
        let path = PathBuffer::rooted(Path::new("root/"), b"/docs/");
        assert_eq!(b"root/docs/", path.as_bytes());
    }

    #[test]
    fn filesystem_root_is_not_doubled() {
        assert_eq!(b"/x", PathBuffer::rooted(Path::new("/"), b"/x").as_bytes());
        assert_eq!(b"/", PathBuffer::rooted(Path::new("//"), b"/").as_bytes());
    }

    #[test]
    fn with_child_restores_length() {
        let mut path = PathBuffer::rooted(Path::new("root"), b"/docs/");
        let before = path.len();

        let seen = path.with_child(OsStr::new("first.txt"), |p| p.to_path_buf());
        assert_eq!(Path::new("root/docs/first.txt"), seen);
        assert_eq!(before, path.len());

        let seen = path.with_child(OsStr::new("b"), |p| p.to_path_buf());
        assert_eq!(Path::new("root/docs/b"), seen);
        assert_eq!(b"root/docs/", path.as_bytes());
    }

    #[test]
    fn with_child_adds_separator_when_missing() {
        let mut path = PathBuffer::rooted(Path::new("root"), b"/docs");
        let seen = path.with_child(OsStr::new("x"), |p| p.to_path_buf());
        assert_eq!(Path::new("root/docs/x"), seen);
        assert_eq!(b"root/docs", path.as_bytes());
    }
}
