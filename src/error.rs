use std::fmt::Display;

/// Bucketdb errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// `open` was called on a handle that already has an open file.
    AlreadyOpen,
    /// The handle has no open file.
    NotOpen,
    /// An IO error, wrapping any failed syscall.
    Io(String),
    /// A sector-aligned allocation failed.
    OutOfMemory,
    /// Truncated or otherwise malformed on-disk data.
    InvalidData(String),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::AlreadyOpen => write!(f, "a file is already open"),
            Error::NotOpen => write!(f, "no file is open"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
            Error::OutOfMemory => write!(f, "aligned allocation failed"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

/// Constructs an Error::InvalidData for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => { $crate::error::Error::InvalidData(format!($($args)*)).into() };
}

/// A bucketdb Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
