//! # Engine Errors
//!
//! [`EngineError`] unifies the errors of every layer below the engine.
//! [`ErrorReport`] is what a caller shows the user: a stable machine code
//! plus a message that never leaks SQL.
//!
//! ## Error Flow
//! ```text
//! ValidationError ──► CoreError ──┐
//!                                 ├──► EngineError ──► ErrorReport { code, message }
//!         sqlx::Error ──► DbError ┤
//!                     ConfigError ┘
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// Any failure of an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl EngineError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorReport::from(self).code
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Error Report
// =============================================================================

/// Error shape handed to callers.
///
/// ## JSON Format
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Paneer Tikka: available 3, requested 5"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    InvalidState,
    DuplicateInvoiceNumber,
    Forbidden,
    InactiveAccount,
    Conflict,
    DatabaseError,
    ConfigError,
    Internal,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorReport {
            code,
            message: message.into(),
        }
    }
}

impl From<&CoreError> for ErrorReport {
    fn from(err: &CoreError) -> Self {
        let code = match err {
            CoreError::ItemNotFound { .. } | CoreError::InvoiceNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidStateTransition { .. } => ErrorCode::InvalidState,
            CoreError::DuplicateInvoiceNumber { .. } => ErrorCode::DuplicateInvoiceNumber,
            CoreError::ForbiddenRole { .. } => ErrorCode::Forbidden,
            CoreError::InactiveAccount { .. } => ErrorCode::InactiveAccount,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ErrorReport::new(code, err.to_string())
    }
}

impl From<&DbError> for ErrorReport {
    fn from(err: &DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ErrorReport::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
            }
            DbError::UniqueViolation { .. } => {
                ErrorReport::new(ErrorCode::Conflict, "Record was changed concurrently, retry")
            }
            _ => {
                tracing::error!(error = %err, "Database error");
                ErrorReport::new(ErrorCode::DatabaseError, "A database error occurred")
            }
        }
    }
}

impl From<&EngineError> for ErrorReport {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Core(e) => e.into(),
            EngineError::Db(e) => e.into(),
            EngineError::Config(e) => ErrorReport::new(ErrorCode::ConfigError, e.to_string()),
        }
    }
}

impl From<EngineError> for ErrorReport {
    fn from(err: EngineError) -> Self {
        (&err).into()
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorReport {}
