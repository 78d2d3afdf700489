//! Common error types used throughout framekeeper.

/// Common error type for framekeeper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A value could not be recognised as a member of a closed enumeration.
    #[error("Unrecognised {kind}: {value:?}")]
    Unrecognised { kind: &'static str, value: String },
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Unrecognised error.
    pub fn unrecognised<S: Into<String>>(kind: &'static str, value: S) -> Self {
        Self::Unrecognised {
            kind,
            value: value.into(),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
