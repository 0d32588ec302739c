use thiserror::Error;

use crate::store::DuplicateReport;

/// Errors produced while talking to the quote service.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate detected: {}", .0.message)]
    DuplicateDetected(DuplicateReport),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl StoreError {
    /// True for failures worth retrying: transport-level errors and 5xx
    /// responses. Everything else reflects a decision the server already
    /// made about the request.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(_) => true,
            StoreError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server = StoreError::Server {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(server.is_transient());

        let conflict = StoreError::Server {
            status: 409,
            message: "duplicate".to_string(),
        };
        assert!(!conflict.is_transient());

        assert!(!StoreError::NotFound("quote abc".to_string()).is_transient());
        assert!(!StoreError::Validation("'quote' is required".to_string()).is_transient());
    }
}
