//! Organization request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::path_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, OrgContext};
use crate::models::{
    CreateOrganizationRequest, InviteRequest, MemberResponse, MembershipResponse, MessageResponse,
    OrganizationResponse,
};
use crate::services::organizations;

/// `POST /organizations`
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateOrganizationRequest>,
) -> AppResult<(StatusCode, Json<OrganizationResponse>)> {
    let org = organizations::create(&state, &user.0, body).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

/// `GET /organizations`
pub async fn list_mine_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<OrganizationResponse>>> {
    Ok(Json(organizations::list_mine(&state, &user.0).await?))
}

/// `POST /organizations/{id}/join`
pub async fn join_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MembershipResponse>> {
    let org_id = path_id(&id, "organization")?;
    Ok(Json(organizations::join(&state, &user.0, org_id).await?))
}

/// `POST /organizations/{id}/invite`
pub async fn invite_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<InviteRequest>,
) -> AppResult<(StatusCode, Json<MembershipResponse>)> {
    let org_id = path_id(&id, "organization")?;
    let membership = organizations::invite(&state, &user.0, org_id, body).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// `POST /organizations/{id}/switch`
pub async fn switch_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<OrganizationResponse>> {
    let org_id = path_id(&id, "organization")?;
    Ok(Json(organizations::switch(&state, &user.0, org_id).await?))
}

/// `POST /organizations/{id}/leave`
pub async fn leave_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let org_id = path_id(&id, "organization")?;
    Ok(Json(organizations::leave(&state, &user.0, org_id).await?))
}

/// `GET /organizations/members`: org from `X-Org-ID` or `?orgId=`. ORGANIZER only.
pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
) -> AppResult<Json<Vec<MemberResponse>>> {
    Ok(Json(organizations::list_members(&state, &ctx.0).await?))
}
