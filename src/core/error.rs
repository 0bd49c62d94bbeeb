//! Error types for trainwatch.

use thiserror::Error;

/// Result type alias for trainwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trainwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport credentials are not configured")]
    MissingTransportConfig,

    // Feed state errors
    #[error("Feed state corrupted in {path}: {reason}")]
    CorruptFeedState { path: String, reason: String },

    // Relay errors
    #[error("Broadcast relay already started")]
    RelayAlreadyStarted,

    #[error("Broadcast relay has been shut down")]
    RelayShutDown,

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_corrupt_state_display() {
        let err = Error::CorruptFeedState {
            path: "/tmp/group_index.dump".to_string(),
            reason: "unexpected end of file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Feed state corrupted in /tmp/group_index.dump: unexpected end of file"
        );
    }
}
