//! Unified error types and result handling.
//!
//! Every layer of the service returns [`Result`]. The HTTP layer turns an
//! [`Error`] into a status code and a JSON body in `api::error`.

use thiserror::Error;

/// Errors produced by the cafeteria backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Input rejected by a business rule
    #[error("{field}: {message}")]
    Validation {
        /// Field that failed validation
        field: &'static str,
        /// Reason for the rejection
        message: String,
    },

    /// A monetary amount is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },

    /// Lookup by key found nothing
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Key used for the lookup
        key: String,
    },

    /// A uniqueness rule would be violated
    #[error("Conflict: {message}")]
    Conflict {
        /// Which rule was violated
        message: String,
    },

    /// A status change that the state machine does not allow
    #[error("Cannot change {entity} status from {from} to {to}")]
    InvalidTransition {
        /// Kind of record being transitioned
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// The chatbot has nothing to talk about
    #[error("No items are available")]
    NoAvailableItems,

    /// Completed or failed payments are frozen
    #[error("Payment state can no longer be modified")]
    PaymentFinalized,

    /// Missing or invalid credentials
    #[error("Authentication failed: {message}")]
    Unauthorized {
        /// Why the credentials were rejected
        message: String,
    },

    /// Authenticated user lacks the required role
    #[error("Permission denied")]
    Forbidden,

    /// Required external API keys are not configured
    #[error("Missing API keys: {}", .keys.join(", "))]
    MissingApiKeys {
        /// Names of the missing settings
        keys: Vec<&'static str>,
    },

    /// An outbound HTTP service failed
    #[error("{service} API error: {message}")]
    Upstream {
        /// Name of the external service
        service: &'static str,
        /// Error reported by the client or the service
        message: String,
    },

    /// Password hashing failure
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// I/O failure (config files, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable could not be read
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] error.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for a [`Error::Conflict`] error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// Whether a database error comes from a unique index.
#[must_use]
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

impl From<argon2::password_hash::Error> for Error {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(value.to_string())
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
