//! Crate-wide error type.

use std::io;
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

/// Everything that can go wrong when reading a geodatabase.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A file, table, or row does not exist.
    ///
    /// Note that a resolvable but deleted row is *not* an error: `TableFile::read_row` returns
    /// `Ok(None)` for that case, reserving this variant for directories, files, and names that
    /// are genuinely absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bytes on disk do not match the format this crate understands.
    #[error("malformed file geodatabase data: {0}")]
    FormatError(String),

    /// An underlying I/O operation failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The bytes are well-formed but describe a feature this crate does not implement.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A caller passed an argument that can never be valid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::FormatError(format!("invalid utf-8: {}", err))
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Error {
        Error::UnsupportedFeature(format!("value does not fit the native address space: {}", err))
    }
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
