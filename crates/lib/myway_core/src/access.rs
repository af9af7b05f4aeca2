//! Access decision gate.
//!
//! Every tenant-scoped operation funnels through [`AccessGate`]:
//!
//! 1. identify the bearer (access token → principal),
//! 2. determine the target organization, either directly from a request hint
//!    or by walking the ownership chain of the addressed resource,
//! 3. require an active membership in that organization,
//! 4. require the membership role to be in the operation's role set.
//!
//! The first failing step is terminal. A non-member addressing a resource by
//! id gets `NotFound`, the same answer as for an id that does not exist.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::session::SessionManager;
use crate::models::auth::{Identity, Role};
use crate::repo::{HierarchyRepository, MembershipRepository, StorageError};
use crate::tenancy::TenancyError;
use crate::tenancy::membership::MembershipResolver;
use crate::tenancy::ownership::{OwnershipResolver, ResourceRef};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Where the organization of a request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgTarget {
    /// Org id supplied by the client (header, query, path or body).
    Direct(Uuid),
    /// Org derived from the addressed resource.
    Resource(ResourceRef),
}

/// Parse a raw org hint. Absent, blank and non-UUID hints are all `BadRequest`.
pub fn parse_org_hint(raw: Option<&str>) -> Result<Uuid, AccessError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AccessError::BadRequest("Organization context required".to_string()));
    }
    Uuid::parse_str(raw).map_err(|_| AccessError::BadRequest("Invalid organization id".to_string()))
}

/// A granted request: who, in which organization, with which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub identity: Identity,
    pub org_id: Uuid,
    pub role: Role,
}

impl AccessContext {
    pub fn principal_id(&self) -> Uuid {
        self.identity.principal_id
    }

    pub fn is_instructor(&self) -> bool {
        Role::INSTRUCTORS.contains(&self.role)
    }
}

pub struct AccessGate<S: ?Sized> {
    sessions: SessionManager<S>,
    members: MembershipResolver<S>,
    ownership: OwnershipResolver<S>,
}

impl<S: ?Sized> Clone for AccessGate<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            members: self.members.clone(),
            ownership: self.ownership.clone(),
        }
    }
}

impl<S> AccessGate<S>
where
    S: MembershipRepository + HierarchyRepository + ?Sized,
{
    pub fn new(store: Arc<S>, codec: Arc<TokenCodec>) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&store), codec),
            members: MembershipResolver::new(Arc::clone(&store)),
            ownership: OwnershipResolver::new(store),
        }
    }

    /// Step 1 alone, from a raw `Authorization` header value.
    pub fn identify(&self, bearer: Option<&str>) -> Result<Identity, AccessError> {
        self.sessions
            .identify_bearer(bearer)
            .map_err(|_| AccessError::Unauthenticated)
    }

    /// Steps 2-4 for an already identified principal.
    pub async fn authorize(
        &self,
        identity: Identity,
        target: OrgTarget,
        roles: &[Role],
    ) -> Result<AccessContext, AccessError> {
        let org_id = match target {
            OrgTarget::Direct(org_id) => org_id,
            OrgTarget::Resource(resource) => match self.ownership.org_of(resource).await {
                Ok(org_id) => org_id,
                Err(TenancyError::Storage(e)) => return Err(e.into()),
                Err(_) => {
                    debug!(%resource, "resource not found");
                    return Err(AccessError::NotFound);
                }
            },
        };

        let membership = match self.members.resolve(identity.principal_id, org_id).await {
            Ok(m) => m,
            Err(TenancyError::Storage(e)) => return Err(e.into()),
            Err(_) => {
                debug!(principal_id = %identity.principal_id, %org_id, "not a member");
                return Err(match target {
                    OrgTarget::Direct(_) => AccessError::Forbidden,
                    OrgTarget::Resource(_) => AccessError::NotFound,
                });
            }
        };

        let role = MembershipResolver::<S>::role_of(&membership);
        if !roles.contains(&role) {
            debug!(
                principal_id = %identity.principal_id,
                %org_id,
                %role,
                "role not permitted"
            );
            return Err(AccessError::Forbidden);
        }

        Ok(AccessContext {
            identity,
            org_id,
            role,
        })
    }

    /// Full gate: bearer header plus explicit target.
    pub async fn guard(
        &self,
        bearer: Option<&str>,
        target: OrgTarget,
        roles: &[Role],
    ) -> Result<AccessContext, AccessError> {
        let identity = self.identify(bearer)?;
        self.authorize(identity, target, roles).await
    }

    /// Full gate with the org taken from a raw hint string.
    pub async fn guard_hint(
        &self,
        bearer: Option<&str>,
        org_hint: Option<&str>,
        roles: &[Role],
    ) -> Result<AccessContext, AccessError> {
        let identity = self.identify(bearer)?;
        let org_id = parse_org_hint(org_hint)?;
        self.authorize(identity, OrgTarget::Direct(org_id), roles).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::TokenKind;
    use crate::models::course::NewCourse;
    use crate::models::tenancy::MembershipStatus;
    use crate::repo::CatalogRepository;
    use crate::repo::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        codec: Arc<TokenCodec>,
        gate: AccessGate<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let codec = Arc::new(TokenCodec::new(b"gate-secret"));
        let gate = AccessGate::new(store.clone(), codec.clone());
        Fixture { store, codec, gate }
    }

    impl Fixture {
        fn bearer(&self, principal_id: Uuid) -> String {
            let issued = self
                .codec
                .issue(principal_id, "p@x.com", TokenKind::Access)
                .unwrap();
            format!("Bearer {}", issued.token)
        }

        async fn org_with_course(&self, owner: Uuid) -> (Uuid, Uuid) {
            let (org, _) = self.store.create_organization("Org", owner).await.unwrap();
            let course = self
                .store
                .create_course(NewCourse {
                    org_id: org.id,
                    code: "C1".into(),
                    title: "Course".into(),
                    description: String::new(),
                    created_by: owner,
                })
                .await
                .unwrap();
            (org.id, course.id)
        }
    }

    #[test]
    fn org_hint_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(parse_org_hint(Some(&id.to_string())).unwrap(), id);
        assert_eq!(parse_org_hint(Some(&format!(" {id} "))).unwrap(), id);
        assert!(matches!(parse_org_hint(None), Err(AccessError::BadRequest(_))));
        assert!(matches!(parse_org_hint(Some("")), Err(AccessError::BadRequest(_))));
        assert!(matches!(parse_org_hint(Some("org-1")), Err(AccessError::BadRequest(_))));
    }

    #[tokio::test]
    async fn member_with_permitted_role_is_granted() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let (org, course) = f.org_with_course(owner).await;
        let bearer = f.bearer(owner);

        let ctx = f
            .gate
            .guard(Some(&bearer), OrgTarget::Resource(ResourceRef::Course(course)), Role::ORGANIZER_ONLY)
            .await
            .unwrap();
        assert_eq!(ctx.org_id, org);
        assert_eq!(ctx.role, Role::Organizer);
        assert_eq!(ctx.principal_id(), owner);
        assert!(ctx.is_instructor());
    }

    #[tokio::test]
    async fn missing_or_bad_bearer_is_unauthenticated_before_anything_else() {
        let f = fixture();
        let org = Uuid::new_v4();
        for bearer in [None, Some("Basic abc"), Some("Bearer junk")] {
            assert!(matches!(
                f.gate.guard_hint(bearer, None, Role::ALL).await,
                Err(AccessError::Unauthenticated)
            ));
        }
        let refresh = f.codec.issue(Uuid::new_v4(), "p@x.com", TokenKind::Refresh).unwrap();
        let header = format!("Bearer {}", refresh.token);
        assert!(matches!(
            f.gate.guard(Some(&header), OrgTarget::Direct(org), Role::ALL).await,
            Err(AccessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn authenticated_without_org_hint_is_bad_request() {
        let f = fixture();
        let bearer = f.bearer(Uuid::new_v4());
        assert!(matches!(
            f.gate.guard_hint(Some(&bearer), Some("  "), Role::ALL).await,
            Err(AccessError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn non_member_is_forbidden_on_direct_org_and_not_found_on_resource() {
        let f = fixture();
        let (org, course) = f.org_with_course(Uuid::new_v4()).await;
        let outsider = f.bearer(Uuid::new_v4());

        assert!(matches!(
            f.gate.guard(Some(&outsider), OrgTarget::Direct(org), Role::ALL).await,
            Err(AccessError::Forbidden)
        ));
        let existing = f
            .gate
            .guard(Some(&outsider), OrgTarget::Resource(ResourceRef::Course(course)), Role::ALL)
            .await
            .unwrap_err();
        let missing = f
            .gate
            .guard(
                Some(&outsider),
                OrgTarget::Resource(ResourceRef::Course(Uuid::new_v4())),
                Role::ALL,
            )
            .await
            .unwrap_err();
        assert!(matches!(existing, AccessError::NotFound));
        assert!(matches!(missing, AccessError::NotFound));
        assert_eq!(existing.to_string(), missing.to_string());
    }

    #[tokio::test]
    async fn inactive_member_is_treated_as_non_member() {
        let f = fixture();
        let (org, _) = f.org_with_course(Uuid::new_v4()).await;
        let leaver = Uuid::new_v4();
        f.store
            .create_membership(org, leaver, Role::Teacher, MembershipStatus::Inactive)
            .await
            .unwrap();
        let bearer = f.bearer(leaver);
        assert!(matches!(
            f.gate.guard(Some(&bearer), OrgTarget::Direct(org), Role::ALL).await,
            Err(AccessError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn role_outside_required_set_is_forbidden() {
        let f = fixture();
        let (org, course) = f.org_with_course(Uuid::new_v4()).await;
        let student = Uuid::new_v4();
        f.store
            .create_membership(org, student, Role::Student, MembershipStatus::Active)
            .await
            .unwrap();
        let bearer = f.bearer(student);
        let target = OrgTarget::Resource(ResourceRef::Course(course));

        assert!(f.gate.guard(Some(&bearer), target, Role::ALL).await.is_ok());
        assert!(matches!(
            f.gate.guard(Some(&bearer), target, Role::INSTRUCTORS).await,
            Err(AccessError::Forbidden)
        ));
        assert!(matches!(
            f.gate.guard(Some(&bearer), target, Role::ORGANIZER_ONLY).await,
            Err(AccessError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn empty_role_set_admits_nobody() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let (org, _) = f.org_with_course(owner).await;
        let bearer = f.bearer(owner);
        assert!(matches!(
            f.gate.guard(Some(&bearer), OrgTarget::Direct(org), &[]).await,
            Err(AccessError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn role_change_is_seen_on_the_next_request() {
        let f = fixture();
        let (org, _) = f.org_with_course(Uuid::new_v4()).await;
        let teacher = Uuid::new_v4();
        let membership = f
            .store
            .create_membership(org, teacher, Role::Teacher, MembershipStatus::Active)
            .await
            .unwrap();
        let bearer = f.bearer(teacher);
        assert!(f.gate.guard(Some(&bearer), OrgTarget::Direct(org), Role::INSTRUCTORS).await.is_ok());

        f.store
            .update_membership(membership.id, Role::Student, MembershipStatus::Active)
            .await
            .unwrap();
        assert!(matches!(
            f.gate.guard(Some(&bearer), OrgTarget::Direct(org), Role::INSTRUCTORS).await,
            Err(AccessError::Forbidden)
        ));
    }
}
