//! Authentication service: thin glue over the core session manager.

use myway_core::auth::session::SignUpRequest;
use myway_core::models::auth::Identity;
use myway_core::repo::{MembershipRepository, PrincipalRepository};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthResponse, LogoutAllResponse, MeResponse, MessageResponse, OrganizationResponse,
    RefreshResponse, SigninRequest, SignupRequest,
};

pub async fn signup(state: &AppState, body: SignupRequest) -> AppResult<AuthResponse> {
    let session = state
        .sessions()
        .sign_up(SignUpRequest {
            email: body.email,
            password: body.password,
            name: body.name,
            role: body.role,
        })
        .await?;
    Ok(session.into())
}

pub async fn signin(state: &AppState, body: SigninRequest) -> AppResult<AuthResponse> {
    let session = state.sessions().sign_in(&body.email, &body.password).await?;
    Ok(session.into())
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<RefreshResponse> {
    Ok(state.sessions().refresh(refresh_token).await?.into())
}

pub async fn logout(state: &AppState, refresh_token: &str) -> AppResult<MessageResponse> {
    state.sessions().logout(refresh_token).await?;
    Ok(MessageResponse::new("Logged out successfully"))
}

pub async fn logout_all(state: &AppState, user: &Identity) -> AppResult<LogoutAllResponse> {
    let revoked = state.sessions().logout_all(user.principal_id).await?;
    info!(user_id = %user.principal_id, revoked, "all sessions revoked");
    Ok(LogoutAllResponse { revoked })
}

/// The caller's public fields plus their active organizations.
pub async fn me(state: &AppState, user: &Identity) -> AppResult<MeResponse> {
    let principal = state
        .store
        .find_principal(user.principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let organizations = state
        .store
        .list_memberships(user.principal_id)
        .await?
        .into_iter()
        .filter(|m| m.membership.is_active())
        .map(|m| OrganizationResponse::new(m.organization, m.membership.role))
        .collect();
    Ok(MeResponse {
        user: principal.into(),
        organizations,
    })
}
