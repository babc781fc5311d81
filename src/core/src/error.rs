use thiserror::Error;

/// Coarse classification of a [`CriError`].
///
/// Callers branch on this instead of matching error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required identifier was empty; no remote call was made.
    InvalidInput,
    /// A volume mount could not be resolved to host content.
    ResolutionFailure,
    /// The runtime (or the connection to it) failed the request.
    RemoteFailure,
    /// Local configuration or declaration could not be loaded.
    Configuration,
}

/// vkcri error types
#[derive(Error, Debug)]
pub enum CriError {
    /// Empty or otherwise unusable identifier
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A container mount could not be resolved
    #[error("Volume resolution failed for '{volume}': {message}")]
    VolumeResolution { volume: String, message: String },

    /// Error status returned by the CRI runtime, carried verbatim
    #[error("Runtime error: {0}")]
    Remote(#[from] tonic::Status),

    /// Could not establish the gRPC channel to the runtime
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CriError {
    /// Shorthand for an empty-identifier error.
    pub fn empty_id(what: &str) -> Self {
        CriError::InvalidInput(format!("{what} cannot be empty"))
    }

    /// Classify this error.
    ///
    /// I/O errors only arise while materializing volume content, so they
    /// count as resolution failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CriError::InvalidInput(_) => ErrorKind::InvalidInput,
            CriError::VolumeResolution { .. } | CriError::IoError(_) => {
                ErrorKind::ResolutionFailure
            }
            CriError::Remote(_) | CriError::Transport(_) => ErrorKind::RemoteFailure,
            CriError::SerializationError(_) | CriError::ConfigError(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// The gRPC status returned by the runtime, if this is a remote error.
    pub fn status(&self) -> Option<&tonic::Status> {
        match self {
            CriError::Remote(status) => Some(status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CriError {
    fn from(err: serde_json::Error) -> Self {
        CriError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CriError {
    fn from(err: serde_yaml::Error) -> Self {
        CriError::SerializationError(err.to_string())
    }
}

/// Result type alias for vkcri operations
pub type Result<T> = std::result::Result<T, CriError>;
