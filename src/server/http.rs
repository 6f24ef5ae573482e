use std::result::Result;

pub const METHOD_MAX: usize = 32;
/// Kept well under the single 4096-byte request read so an over-long path
/// is reported as such rather than as a missing line terminator.
pub const PATH_MAX: usize = 2048;
pub const VERSION_MAX: usize = 32;

#[derive(Debug, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: Vec<u8>,
    pub version: String,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("request line is not terminated by CRLF")]
    NoLineTerminator,
    #[error("request line is missing the {0}")]
    MissingField(&'static str),
    #[error("{field} is longer than {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },
}

/// Parses `METHOD PATH VERSION` out of the first line of `data`.
/// Tokens are separated by spaces or tabs; anything after the third token is ignored.
pub fn parse_request(data: &[u8]) -> Result<Request, ParseError> {
    let end = find_crlf(data).ok_or(ParseError::NoLineTerminator)?;
    let mut tokens = data[..end]
        .split(|b| is_blank(*b))
        .filter(|token| !token.is_empty());

    let method = next_field(&mut tokens, "method", METHOD_MAX)?;
    let path = next_field(&mut tokens, "path", PATH_MAX)?;
    let version = next_field(&mut tokens, "version", VERSION_MAX)?;

    Ok(Request {
        method: String::from_utf8_lossy(method).into_owned(),
        path: path.to_vec(),
        version: String::from_utf8_lossy(version).into_owned(),
    })
}

fn next_field<'a, I>(tokens: &mut I, field: &'static str, max: usize) -> Result<&'a [u8], ParseError>
    where I: Iterator<Item = &'a [u8]> {
    match tokens.next() {
        None => Err(ParseError::MissingField(field)),
        Some(token) if token.len() > max => Err(ParseError::FieldTooLong { field, max }),
        Some(token) => Ok(token),
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}
