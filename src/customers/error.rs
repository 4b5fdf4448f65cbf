use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
/// Errors returned by customer operations.
pub enum CustomerError {
    /// No customer with this id.
    #[error("customer '{id}' not found")]
    NotFound {
        /// Requested id.
        id: Uuid,
    },

    /// Another customer already holds a unique value.
    #[error("a customer with {field} '{value}' already exists")]
    Conflict {
        /// Field name (`tax_id` or `email`).
        field: &'static str,
        /// Conflicting value.
        value: String,
    },

    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Field name.
        field: &'static str,
        /// Error message.
        message: String,
    },

    /// The backing repository failed.
    #[error("repository error: {message}")]
    Repository {
        /// Error message.
        message: String,
    },

    /// The request was cancelled before the operation ran.
    #[error("operation cancelled")]
    Cancelled,
}

impl CustomerError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Convenience result type for customer operations.
pub type CustomerResult<T> = Result<T, CustomerError>;
