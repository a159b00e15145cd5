//! Reading the body to search from standard input.

use std::io::{self, Read};

use sift_core::SiftError;

/// Read `reader` to end-of-stream as UTF-8 text.
///
/// # Errors
///
/// Returns the underlying I/O error, or [`io::ErrorKind::InvalidData`] if
/// the bytes are not valid UTF-8.
///
/// # Examples
///
/// ```
/// use sift_search::input::read_from;
///
/// let text = read_from("hello\nworld\n".as_bytes()).unwrap();
/// assert_eq!(text, "hello\nworld\n");
/// ```
pub fn read_from<R: Read>(mut reader: R) -> io::Result<String> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    Ok(input)
}

/// Read all of standard input. No size limit is imposed.
///
/// # Errors
///
/// Fails if stdin cannot be read (for example, a closed descriptor).
pub fn read_all() -> io::Result<String> {
    read_from(io::stdin().lock())
}

/// Trim surrounding whitespace and reject an empty body.
///
/// Offsets reported by the backend refer to the trimmed text, which is
/// what gets sent.
///
/// # Errors
///
/// Returns [`SiftError::EmptyInput`] if nothing but whitespace was read.
///
/// # Examples
///
/// ```
/// use sift_search::input::prepare_body;
///
/// assert_eq!(prepare_body("  text \n".into()).unwrap(), "text");
/// assert!(prepare_body(" \n\t".into()).is_err());
/// ```
pub fn prepare_body(raw: String) -> Result<String, SiftError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SiftError::EmptyInput);
    }
    if trimmed.len() == raw.len() {
        return Ok(raw);
    }
    Ok(trimmed.to_string())
}

/// Read stdin and apply [`prepare_body`].
///
/// # Errors
///
/// Returns [`SiftError::Io`] on read failure or [`SiftError::EmptyInput`].
pub fn read_body() -> Result<String, SiftError> {
    prepare_body(read_all()?)
}
