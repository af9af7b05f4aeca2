//! Authentication middleware: bearer identification and org-context resolution.

use axum::extract::{Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use myway_core::access::{AccessContext, OrgTarget, parse_org_hint};
use myway_core::models::auth::{Identity, Role};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

/// Header carrying the caller's current organization.
pub const ORG_HEADER: &str = "x-org-id";

/// Identity of the bearer, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// Granted org context, stored in request extensions by [`require_org_role`].
#[derive(Debug, Clone)]
pub struct OrgContext(pub AccessContext);

/// State for [`require_org_role`]: the app state plus the route's role set.
#[derive(Clone)]
pub struct OrgScope {
    pub state: AppState,
    pub roles: &'static [Role],
}

impl OrgScope {
    pub fn new(state: AppState, roles: &'static [Role]) -> Self {
        Self { state, roles }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgQuery {
    org_id: Option<String>,
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies it as an
/// access token, and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let identity = state.sessions().identify_bearer(header)?;
    request.extensions_mut().insert(AuthenticatedUser(identity));

    Ok(next.run(request).await)
}

/// Axum middleware: resolves the org from the `X-Org-ID` header (falling back
/// to the `orgId` query parameter), checks membership and role, and injects
/// [`OrgContext`]. Must run inside [`require_auth`].
pub async fn require_org_role(
    State(scope): State<OrgScope>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.0.clone())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let hint = match request.headers().get(ORG_HEADER) {
        Some(v) => Some(
            v.to_str()
                .map_err(|_| AppError::BadRequest("Invalid organization id".into()))?
                .to_string(),
        ),
        None => Query::<OrgQuery>::try_from_uri(request.uri())
            .map(|q| q.0.org_id)
            .unwrap_or_default(),
    };
    let org_id = parse_org_hint(hint.as_deref())?;

    let ctx = scope
        .state
        .gate()
        .authorize(identity, OrgTarget::Direct(org_id), scope.roles)
        .await?;
    request.extensions_mut().insert(OrgContext(ctx));

    Ok(next.run(request).await)
}
