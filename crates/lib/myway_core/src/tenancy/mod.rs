//! Tenancy: who belongs to which organization, and which organization owns
//! a given resource.

pub mod membership;
pub mod ownership;

use thiserror::Error;

use crate::repo::StorageError;

/// Tenancy resolution errors.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// No active membership. Covers both "never joined" and "left".
    #[error("Not a member of this organization")]
    NotAMember,

    /// A link in the ownership chain is missing.
    #[error("Resource not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
