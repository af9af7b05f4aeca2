//! Authentication domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

/// Role of a principal, either as its coarse default or within one organization.
///
/// Comparisons are exact: `Organizer` does not imply `Teacher`. Every guarded
/// operation lists the roles it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Organizer,
}

impl Role {
    /// Any active member.
    pub const ALL: &'static [Role] = &[Role::Student, Role::Teacher, Role::Organizer];
    /// Members allowed to author course content and grade.
    pub const INSTRUCTORS: &'static [Role] = &[Role::Teacher, Role::Organizer];
    /// Organization management.
    pub const ORGANIZER_ONLY: &'static [Role] = &[Role::Organizer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
            Role::Organizer => "ORGANIZER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    /// Accepts any casing and surrounding whitespace (`" teacher "` → `Teacher`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "TEACHER" => Ok(Role::Teacher),
            "ORGANIZER" => Ok(Role::Organizer),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Public principal fields. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Principal with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct PrincipalWithPassword {
    pub principal: Principal,
    pub password_hash: String,
}

/// Input for creating a principal. `email` is expected to be normalized.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Refresh credential record stored by a `CredentialStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCredential {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Which channel a token is valid on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: principal ID (standard JWT `sub` claim).
    pub sub: String,
    pub email: String,
    pub kind: TokenKind,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Random token id; keeps tokens minted in the same second distinct.
    pub jti: String,
}

/// Authenticated identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub principal_id: Uuid,
    pub email: String,
}

/// Normalize an email for storage and lookup: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
