//! Business logic behind the handlers. Every tenant-scoped operation asks the
//! access gate first and only then touches the store.

pub mod assignments;
pub mod auth;
pub mod courses;
pub mod discussions;
pub mod organizations;

use crate::error::{AppError, AppResult};

/// Trimmed, non-empty text field.
pub(crate) fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank collapses to `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
