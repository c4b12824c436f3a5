//! Error types for socket monitors

use thiserror::Error;

/// Socket monitor error type
#[derive(Error, Debug)]
pub enum Error {
    /// The monitor was started more than once
    #[error("socket monitor already started")]
    AlreadyStarted,

    /// The capture mechanism could not be initialized
    #[error("socket capture unavailable: {reason}")]
    Unavailable {
        /// Why the capture layer could not be attached
        reason: String,
    },

    /// A recorded transition could not be decoded
    #[error("invalid transition record on line {line}: {source}")]
    Parse {
        /// 1-based line number in the capture file
        line: usize,
        /// The underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
