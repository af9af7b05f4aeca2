//! Membership resolution.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::TenancyError;
use crate::models::auth::Role;
use crate::models::tenancy::Membership;
use crate::repo::MembershipRepository;

/// Answers "does this principal actively belong to this organization, and as what".
///
/// Always reads through to the repository; nothing is cached between calls, so
/// a deactivated or downgraded membership takes effect on the next request.
pub struct MembershipResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for MembershipResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> MembershipResolver<S>
where
    S: MembershipRepository + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The principal's active membership in `org_id`.
    ///
    /// A missing row and an `Inactive` row both yield `NotAMember`.
    pub async fn resolve(&self, principal_id: Uuid, org_id: Uuid) -> Result<Membership, TenancyError> {
        match self.store.find_membership(principal_id, org_id).await? {
            Some(m) if m.is_active() => Ok(m),
            Some(_) => {
                debug!(%principal_id, %org_id, "membership inactive");
                Err(TenancyError::NotAMember)
            }
            None => {
                debug!(%principal_id, %org_id, "no membership");
                Err(TenancyError::NotAMember)
            }
        }
    }

    pub fn role_of(membership: &Membership) -> Role {
        membership.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenancy::MembershipStatus;
    use crate::repo::CatalogRepository;
    use crate::repo::memory::MemoryStore;

    #[tokio::test]
    async fn active_membership_resolves_with_its_role() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let (org, _) = store.create_organization("Org", owner).await.unwrap();

        let resolver = MembershipResolver::new(store);
        let membership = resolver.resolve(owner, org.id).await.unwrap();
        assert_eq!(MembershipResolver::<MemoryStore>::role_of(&membership), Role::Organizer);
    }

    #[tokio::test]
    async fn never_joined_and_left_are_the_same_outcome() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let leaver = Uuid::new_v4();
        let (org, _) = store.create_organization("Org", owner).await.unwrap();
        store
            .create_membership(org.id, leaver, Role::Teacher, MembershipStatus::Inactive)
            .await
            .unwrap();

        let resolver = MembershipResolver::new(store);
        let never = resolver.resolve(stranger, org.id).await.unwrap_err();
        let left = resolver.resolve(leaver, org.id).await.unwrap_err();
        assert!(matches!(never, TenancyError::NotAMember));
        assert!(matches!(left, TenancyError::NotAMember));
        assert_eq!(never.to_string(), left.to_string());
    }

    #[tokio::test]
    async fn deactivation_takes_effect_on_next_resolve() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let (org, membership) = store.create_organization("Org", owner).await.unwrap();
        let resolver = MembershipResolver::new(store.clone());
        assert!(resolver.resolve(owner, org.id).await.is_ok());

        store
            .update_membership(membership.id, Role::Organizer, MembershipStatus::Inactive)
            .await
            .unwrap();
        assert!(matches!(
            resolver.resolve(owner, org.id).await,
            Err(TenancyError::NotAMember)
        ));
    }
}
