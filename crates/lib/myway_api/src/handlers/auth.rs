//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthResponse, LogoutAllResponse, LogoutRequest, MeResponse, MessageResponse, RefreshRequest,
    RefreshResponse, SigninRequest, SignupRequest,
};
use crate::services::auth;

/// `POST /auth/signup`: create an account and open a session.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let resp = auth::signup(&state, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /auth/signin`: authenticate with email + password.
pub async fn signin_handler(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(auth::signin(&state, body).await?))
}

/// `POST /auth/refresh`: exchange a refresh token for a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    Ok(Json(auth::refresh(&state, &body.refresh_token).await?))
}

/// `POST /auth/logout`: revoke one refresh token. No access token needed.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(auth::logout(&state, &body.refresh_token).await?))
}

/// `POST /auth/logout-all`: revoke every refresh token of the caller.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<LogoutAllResponse>> {
    Ok(Json(auth::logout_all(&state, &user.0).await?))
}

/// `GET /auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<MeResponse>> {
    Ok(Json(auth::me(&state, &user.0).await?))
}
