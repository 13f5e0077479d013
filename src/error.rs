use std::fmt;
use std::io;

/// Errors the core distinguishes, per the compressed-stream contract.
///
/// `FilterFailure` has no variant here: the filter layer (out of scope for
/// this crate) handles that failure upstream and the core never observes it.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    BadHeader(String),
    ChecksumMismatch,
    AllocFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::BadHeader(msg) => write!(f, "bad header: {msg}"),
            Error::ChecksumMismatch => write!(f, "damaged file: header checksum mismatch"),
            Error::AllocFailure(what) => write!(f, "allocation failed: {what}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}
