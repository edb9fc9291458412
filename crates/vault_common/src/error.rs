//! Error types for ProgressVault.
//!
//! Identity failures are returned to callers as values; the progress
//! simulator reports its preconditions through `SkipReason` instead.

use thiserror::Error;

/// Failures of the persistent store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Failures reported by the identity simulator.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Incorrect password")]
    InvalidPassword,

    #[error("{0}")]
    InvalidInput(String),

    /// Carries the generic message shown to the learner; the cause goes to tracing.
    #[error("{0}")]
    StorageFailure(&'static str),
}

impl AuthError {
    pub fn code(&self) -> i32 {
        match self {
            AuthError::DuplicateEmail => 409,
            AuthError::EmailNotFound => 404,
            AuthError::InvalidPassword => 401,
            AuthError::InvalidInput(_) => 422,
            AuthError::StorageFailure(_) => 500,
        }
    }

    /// Message for the consumer boundary (`{ error: string | null }`).
    pub fn message(&self) -> String {
        self.to_string()
    }
}
