//! Organization service: creation, discovery and membership management.
//!
//! Join and list-mine act on memberships themselves and so skip the gate;
//! everything else goes through it.

use myway_core::access::{AccessContext, OrgTarget};
use myway_core::models::auth::{Identity, Role, normalize_email};
use myway_core::models::tenancy::MembershipStatus;
use myway_core::repo::{CatalogRepository, MembershipRepository, PrincipalRepository};
use tracing::info;
use uuid::Uuid;

use super::required;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateOrganizationRequest, InviteRequest, MemberResponse, MembershipResponse, MessageResponse,
    OrganizationResponse,
};

pub async fn create(
    state: &AppState,
    user: &Identity,
    body: CreateOrganizationRequest,
) -> AppResult<OrganizationResponse> {
    let name = required(&body.name, "name")?;
    let (org, membership) = state
        .store
        .create_organization(&name, user.principal_id)
        .await?;
    info!(org_id = %org.id, owner = %user.principal_id, "organization created");
    Ok(OrganizationResponse::new(org, membership.role))
}

/// Organizations where the caller holds an active membership.
pub async fn list_mine(state: &AppState, user: &Identity) -> AppResult<Vec<OrganizationResponse>> {
    Ok(state
        .store
        .list_memberships(user.principal_id)
        .await?
        .into_iter()
        .filter(|m| m.membership.is_active())
        .map(|m| OrganizationResponse::new(m.organization, m.membership.role))
        .collect())
}

/// Join as STUDENT. A previously left membership is reactivated as STUDENT.
pub async fn join(state: &AppState, user: &Identity, org_id: Uuid) -> AppResult<MembershipResponse> {
    state
        .store
        .find_organization(org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".into()))?;

    let membership = match state.store.find_membership(user.principal_id, org_id).await? {
        Some(m) if m.is_active() => {
            return Err(AppError::Conflict("Already a member of this organization".into()));
        }
        Some(m) => {
            state
                .store
                .update_membership(m.id, Role::Student, MembershipStatus::Active)
                .await?
        }
        None => {
            state
                .store
                .create_membership(org_id, user.principal_id, Role::Student, MembershipStatus::Active)
                .await?
        }
    };
    info!(%org_id, user_id = %user.principal_id, "joined organization");
    Ok(membership.into())
}

/// Add an existing user to the organization. ORGANIZER only.
pub async fn invite(
    state: &AppState,
    user: &Identity,
    org_id: Uuid,
    body: InviteRequest,
) -> AppResult<MembershipResponse> {
    let ctx = state
        .gate()
        .authorize(user.clone(), OrgTarget::Direct(org_id), Role::ORGANIZER_ONLY)
        .await?;

    let role = match body.role.as_deref() {
        None => Role::Student,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AppError::Validation("Invalid role".into()))?,
    };
    let email = normalize_email(&body.email);
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    let invitee = state
        .store
        .find_principal_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?
        .principal;

    let membership = match state.store.find_membership(invitee.id, ctx.org_id).await? {
        Some(m) if m.is_active() => {
            return Err(AppError::Conflict("User is already a member".into()));
        }
        Some(m) => {
            state
                .store
                .update_membership(m.id, role, MembershipStatus::Active)
                .await?
        }
        None => {
            state
                .store
                .create_membership(ctx.org_id, invitee.id, role, MembershipStatus::Active)
                .await?
        }
    };
    info!(
        org_id = %ctx.org_id,
        invited_by = %user.principal_id,
        user_id = %invitee.id,
        %role,
        "member invited"
    );
    Ok(membership.into())
}

/// Confirm the caller may act in `org_id` and return it with their role.
pub async fn switch(state: &AppState, user: &Identity, org_id: Uuid) -> AppResult<OrganizationResponse> {
    let ctx = state
        .gate()
        .authorize(user.clone(), OrgTarget::Direct(org_id), Role::ALL)
        .await?;
    let org = state
        .store
        .find_organization(ctx.org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".into()))?;
    Ok(OrganizationResponse::new(org, ctx.role))
}

/// Deactivate the caller's own membership.
pub async fn leave(state: &AppState, user: &Identity, org_id: Uuid) -> AppResult<MessageResponse> {
    let ctx = state
        .gate()
        .authorize(user.clone(), OrgTarget::Direct(org_id), Role::ALL)
        .await?;
    let membership = state
        .store
        .find_membership(user.principal_id, ctx.org_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Access denied".into()))?;
    state
        .store
        .update_membership(membership.id, membership.role, MembershipStatus::Inactive)
        .await?;
    info!(%org_id, user_id = %user.principal_id, "left organization");
    Ok(MessageResponse::new("Left organization"))
}

pub async fn list_members(state: &AppState, ctx: &AccessContext) -> AppResult<Vec<MemberResponse>> {
    Ok(state
        .store
        .list_members(ctx.org_id)
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect())
}
