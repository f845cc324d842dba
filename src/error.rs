/// Error types for flagwise
///
/// This module defines all possible errors that can occur in the engine.
/// Uses thiserror for ergonomic error handling.
///
/// None of these cross the Advisor boundary: the outermost adapter maps
/// every kind to a safe default (neutral read, no-op write, fallback
/// recommendation). Internally they stay explicit per-operation results.

use thiserror::Error;

/// Main error type for flagwise operations
#[derive(Error, Debug)]
pub enum FlagwiseError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Feedback referencing an unknown interaction
    #[error("Unknown interaction: {0}")]
    UnknownInteraction(i64),

    /// Invalid feedback payload (rating out of range, etc.)
    #[error("Invalid feedback: {0}")]
    Feedback(String),

    /// Invalid user input format
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for flagwise operations
pub type Result<T> = std::result::Result<T, FlagwiseError>;

/// Convert FlagwiseError to a user-friendly error message
impl FlagwiseError {
    pub fn user_message(&self) -> String {
        match self {
            FlagwiseError::Database(e) => {
                format!("Learning store unavailable, recommendations fall back to static patterns. Details: {}", e)
            }
            FlagwiseError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            FlagwiseError::UnknownInteraction(id) => {
                format!("No interaction with id {} was found", id)
            }
            FlagwiseError::Feedback(msg) => {
                format!("Feedback rejected: {}", msg)
            }
            FlagwiseError::InvalidInput(msg) => {
                format!("Invalid input: {}", msg)
            }
            FlagwiseError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_user_messages() {
        let err = FlagwiseError::UnknownInteraction(42);
        assert!(err.user_message().contains("42"));

        let err = FlagwiseError::Feedback("rating must be 1-5".to_string());
        assert!(err.user_message().contains("rating"));
    }

    #[test]
    fn test_error_display() {
        let err = FlagwiseError::InvalidInput("rating must be 1-5".to_string());
        let display = format!("{}", err);
        assert!(display.contains("Invalid input"));
    }
}
