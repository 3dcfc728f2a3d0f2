//! Error types for stage operations.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StageError>;

/// Error type for stage operations.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage does not implement the requested capability.
    ///
    /// This is a permanent condition: retrying the same call on the same
    /// stage will fail the same way.
    #[error("This operation is not supported: {operation}")]
    Unsupported { operation: &'static str },
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// No stage data was found at the given path.
    #[error("No stage found at {}", .path.display())]
    NotFound { path: PathBuf },
    /// A stage was asked to save into a path that is already occupied.
    #[error("Path already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },
    /// The persisted stage is not of the type being loaded.
    #[error("Stage mismatch: expected {expected}, found {found}")]
    StageMismatch { expected: String, found: String },
    /// The stage name is not known to the environment's registry.
    #[error("Unregistered stage: {0}")]
    UnregisteredStage(String),
    /// Invalid or mistyped parameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Table schema or shape mismatch.
    #[error("Schema error: {0}")]
    Schema(String),
    /// Failure raised by a stage's own computation.
    #[error("Computation error: {0}")]
    Computation(String),
    /// CSV reading or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StageError {
    /// Shorthand for [`StageError::Unsupported`].
    pub fn unsupported(operation: &'static str) -> Self {
        StageError::Unsupported { operation }
    }

    /// Returns true for the permanent "operation not supported" condition.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StageError::Unsupported { .. })
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        StageError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for StageError {
    fn from(err: bincode::Error) -> Self {
        StageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unsupported() {
        let err = StageError::unsupported("get_model_data");
        assert_eq!(
            err.to_string(),
            "This operation is not supported: get_model_data"
        );
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_error_display_not_found() {
        let err = StageError::NotFound {
            path: PathBuf::from("/tmp/missing"),
        };
        assert!(err.to_string().contains("/tmp/missing"));
        assert!(!err.is_unsupported());
    }

    #[test]
    fn test_error_display_stage_mismatch() {
        let err = StageError::StageMismatch {
            expected: "A".to_string(),
            found: "B".to_string(),
        };
        assert!(err.to_string().contains("expected A, found B"));
    }

    #[test]
    fn test_error_display_schema() {
        let err = StageError::Schema("unknown column 'x'".to_string());
        assert!(err.to_string().contains("Schema error"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: StageError = io_err.into();
        assert!(matches!(err, StageError::Io(_)));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: StageError = json_err.into();
        assert!(matches!(err, StageError::Serialization(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let bincode_result: std::result::Result<String, bincode::Error> =
            bincode::deserialize(bad_bytes);
        if let Err(e) = bincode_result {
            let err: StageError = e.into();
            assert!(matches!(err, StageError::Serialization(_)));
        }
    }

    #[test]
    fn test_error_is_std_error() {
        let err = StageError::InvalidParameter("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
