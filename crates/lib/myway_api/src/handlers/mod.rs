//! Request handlers.

pub mod assignments;
pub mod auth;
pub mod courses;
pub mod discussions;
pub mod health;
pub mod modules;
pub mod organizations;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Parse a path id, rejecting non-UUIDs with a JSON 400.
pub(crate) fn path_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {what} id")))
}
