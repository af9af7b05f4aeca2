//! Persistence contracts.
//!
//! Every lookup the authorization core performs goes through one of these
//! traits, so the resolvers and the session manager can run against
//! PostgreSQL ([`postgres::PgStore`]) or in-process tables
//! ([`memory::MemoryStore`]) without change.
//!
//! Implementations never retry. A failed round-trip surfaces as
//! [`StorageError`] and the caller decides what to do with it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ParseEnumError;
use crate::models::auth::{NewPrincipal, Principal, PrincipalWithPassword, RefreshCredential, Role};
use crate::models::course::{
    Assignment, Course, Material, Module, NewAssignment, NewCourse, NewMaterial, NewModule, Reply,
    Submission, Thread,
};
use crate::models::tenancy::{MemberSummary, Membership, MembershipStatus, OrgMembership, Organization};

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<ParseEnumError> for StorageError {
    fn from(e: ParseEnumError) -> Self {
        StorageError::Decode(e.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// SHA-256 hex digest of a refresh token value, the form in which it is stored.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Principal (user account) persistence.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Look up by normalized email, including the password hash.
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<PrincipalWithPassword>>;

    async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a principal. A taken email is `StorageError::Duplicate`.
    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Refresh credential persistence: the source of truth for "is this refresh
/// token still valid".
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(
        &self,
        principal_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshCredential>;

    /// Row matching both the token value and the principal, unexpired at `now`.
    /// Expired and mismatched rows are indistinguishable (`None`).
    async fn find_valid(
        &self,
        token: &str,
        principal_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>>;

    /// Idempotent: deleting an unknown token is not an error.
    async fn delete_by_value(&self, token: &str) -> Result<()>;

    /// Delete every credential of a principal, returning how many were removed.
    async fn delete_all_for(&self, principal_id: Uuid) -> Result<u64>;
}

/// Membership persistence.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// The `(org, principal)` row in any status.
    async fn find_membership(&self, principal_id: Uuid, org_id: Uuid) -> Result<Option<Membership>>;

    /// Insert a row. An existing `(org, principal)` pair is `StorageError::Duplicate`.
    async fn create_membership(
        &self,
        org_id: Uuid,
        principal_id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership>;

    async fn update_membership(
        &self,
        id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership>;

    /// All memberships of a principal with their organizations, any status.
    async fn list_memberships(&self, principal_id: Uuid) -> Result<Vec<OrgMembership>>;

    async fn list_members(&self, org_id: Uuid) -> Result<Vec<MemberSummary>>;
}

/// Parent-link lookups along the ownership chain. Each returns the id of the
/// immediate parent, or `None` when the child does not exist.
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    async fn organization_exists(&self, org_id: Uuid) -> Result<bool>;
    async fn course_org(&self, course_id: Uuid) -> Result<Option<Uuid>>;
    async fn module_course(&self, module_id: Uuid) -> Result<Option<Uuid>>;
    async fn material_module(&self, material_id: Uuid) -> Result<Option<Uuid>>;
    async fn assignment_course(&self, assignment_id: Uuid) -> Result<Option<Uuid>>;
    async fn submission_assignment(&self, submission_id: Uuid) -> Result<Option<Uuid>>;
    async fn thread_course(&self, thread_id: Uuid) -> Result<Option<Uuid>>;
}

/// Resource CRUD used by the API services.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Create an organization and its creator's ORGANIZER membership atomically.
    async fn create_organization(&self, name: &str, owner: Uuid) -> Result<(Organization, Membership)>;
    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>>;

    async fn create_course(&self, new: NewCourse) -> Result<Course>;
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>>;
    async fn list_courses(&self, org_id: Uuid) -> Result<Vec<Course>>;

    async fn create_module(&self, new: NewModule) -> Result<Module>;
    async fn find_module(&self, id: Uuid) -> Result<Option<Module>>;
    /// Ordered by position.
    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<Module>>;

    async fn create_material(&self, new: NewMaterial) -> Result<Material>;
    async fn find_material(&self, id: Uuid) -> Result<Option<Material>>;
    async fn list_materials(&self, module_id: Uuid) -> Result<Vec<Material>>;

    async fn create_assignment(&self, new: NewAssignment) -> Result<Assignment>;
    async fn find_assignment(&self, id: Uuid) -> Result<Option<Assignment>>;
    /// Active assignments of a course, earliest due first.
    async fn list_active_assignments(&self, course_id: Uuid) -> Result<Vec<Assignment>>;

    /// Insert the author's submission or reset their existing one to SUBMITTED.
    /// Returns the row and whether it was newly created.
    async fn upsert_submission(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        file_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(Submission, bool)>;
    async fn find_submission(&self, id: Uuid) -> Result<Option<Submission>>;
    async fn list_submissions(&self, assignment_id: Uuid) -> Result<Vec<Submission>>;
    async fn list_submissions_by_user(&self, user_id: Uuid) -> Result<Vec<Submission>>;
    async fn grade_submission(
        &self,
        id: Uuid,
        grade: i32,
        feedback: Option<String>,
    ) -> Result<Submission>;

    async fn create_thread(
        &self,
        course_id: Uuid,
        created_by: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Thread>;
    async fn find_thread(&self, id: Uuid) -> Result<Option<Thread>>;
    /// Newest first.
    async fn list_threads(&self, course_id: Uuid) -> Result<Vec<Thread>>;
    async fn create_reply(&self, thread_id: Uuid, created_by: Uuid, body: &str) -> Result<Reply>;
    /// Oldest first.
    async fn list_replies(&self, thread_id: Uuid) -> Result<Vec<Reply>>;
}

/// Everything the backend persists.
pub trait Store:
    PrincipalRepository + CredentialStore + MembershipRepository + HierarchyRepository + CatalogRepository
{
}

impl<T> Store for T where
    T: PrincipalRepository
        + CredentialStore
        + MembershipRepository
        + HierarchyRepository
        + CatalogRepository
        + ?Sized
{
}
