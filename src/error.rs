use std::io;
use thiserror::Error;

/// Errors that can occur while reading lines backward from a log stream
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("window size must be above zero")]
    BadWindowSize,

    #[error("truncation detected")]
    Truncation,

    #[error("ran out of lines before the request was satisfied")]
    EndOfData,

    #[error("scan state inconsistent: {0}")]
    Inconsistent(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// Whether this error signals the stream shrank or moved under the reader.
    pub fn is_truncation(&self) -> bool {
        matches!(self, ReadError::Truncation)
    }
}
