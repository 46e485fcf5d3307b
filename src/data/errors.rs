use thiserror::Error;

/// Error types for collaborator operations (storage, notification delivery)
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {message} (status: {status_code})")]
    Notification { status_code: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Check if error is retryable on a later cycle
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Network(_) => true,
            DataError::Notification { status_code, .. } => {
                // Server errors (5xx) and rate limiting (429) may clear up
                *status_code >= 500 || *status_code == 429
            }
            DataError::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }

    /// Create a validation error with field context
    pub fn validation_error<S: Into<String>>(field: S, message: S) -> Self {
        DataError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a notification error with status code
    pub fn notification_error<S: Into<String>>(status_code: u16, message: S) -> Self {
        DataError::Notification {
            status_code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DataError::notification_error(502, "bad gateway").is_retryable());
        assert!(DataError::notification_error(429, "slow down").is_retryable());
        assert!(!DataError::notification_error(400, "chat not found").is_retryable());
        assert!(!DataError::validation_error("url", "empty").is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = DataError::validation_error("timestamp", "older than latest sample");
        assert_eq!(
            err.to_string(),
            "Data validation error: timestamp - older than latest sample"
        );
    }
}
