//! Domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! types in `myway_api::models` (which carry `#[serde(rename_all)]` for
//! camelCase etc.).

pub mod auth;
pub mod course;
pub mod tenancy;

use thiserror::Error;

/// Failure to parse one of the closed string enumerations (roles, statuses, kinds).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
