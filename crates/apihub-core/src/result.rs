//! Convenience result type alias for API Hub.

use crate::error::AppError;

/// A specialized `Result` type for API Hub operations.
pub type AppResult<T> = Result<T, AppError>;
