//! Organization and membership models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;
use super::auth::Role;

/// Default plan for a new organization.
pub const DEFAULT_PLAN: &str = "Free";

/// Tenant: the top-level isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

/// Membership status. Only `Active` grants access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipStatus {
    Active,
    Inactive,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "Active",
            MembershipStatus::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(MembershipStatus::Active),
            "Inactive" => Ok(MembershipStatus::Inactive),
            _ => Err(ParseEnumError::new("membership status", s)),
        }
    }
}

/// Join record granting a principal a role within one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub org_id: Uuid,
    pub principal_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// A membership together with its organization (for "my organizations").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMembership {
    pub organization: Organization,
    pub membership: Membership,
}

/// Member listing entry for organization management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub principal_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub status: MembershipStatus,
}
