//! Error types for cantor-core.

use std::sync::Arc;
use thiserror::Error;

/// Error type for cantor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Corrupted or unexpected data.
    #[error("Operation failed: {0}")]
    Fail(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient memory: {0}")]
    InsufficientMemory(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "wav")]
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Coarse classification every [`Error`] collapses onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Fail,
    InvalidArgument,
    InsufficientMemory,
    NotImplemented,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fail(_) | Error::Io(_) => ErrorKind::Fail,
            #[cfg(feature = "wav")]
            Error::Wav(_) => ErrorKind::Fail,
            Error::InvalidArgument(_) | Error::InvalidConfig(_) => ErrorKind::InvalidArgument,
            Error::InsufficientMemory(_) => ErrorKind::InsufficientMemory,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Diagnostic hook invoked with every error the engine raises, before the
/// error is returned or converted into a sentinel result.
pub type ErrorObserver = Arc<dyn Fn(&Error) + Send + Sync>;
