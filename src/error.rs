//! Error types for the admin core.

use thiserror::Error;

use crate::bulk::BulkAction;

/// Failures surfaced to the admin operator.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The document store rejected or never completed a request.
    #[error("store request failed: {0}")]
    Store(String),

    /// An edit was rejected before reaching the store.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A bulk operation did not fully complete. Per-record outcomes are not
    /// retained; the whole batch reports as failed.
    #[error("bulk {action} failed for batch of {total}")]
    Bulk { action: BulkAction, total: usize },
}

impl AdminError {
    /// Wrap any store/SDK failure into the generic request-failed condition.
    pub(crate) fn store<E: std::fmt::Display>(err: E) -> Self {
        AdminError::Store(err.to_string())
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AdminError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result type for admin core operations.
pub type Result<T> = std::result::Result<T, AdminError>;
