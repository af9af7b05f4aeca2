//! Authentication: credential codec, password hashing and the session manager.
//!
//! Shared by the HTTP layer and anything else that needs to mint or check
//! bearer credentials.

pub mod jwt;
pub mod password;
pub mod session;

use thiserror::Error;

use crate::repo::StorageError;

/// Authentication errors.
///
/// `InvalidCredentials`, `InvalidToken` and `Unauthenticated` render with a
/// fixed message; the concrete cause is only ever logged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Email already registered")]
    Conflict,

    #[error("Principal not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}
