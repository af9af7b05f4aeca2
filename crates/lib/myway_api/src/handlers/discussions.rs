//! Discussion request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::path_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CreateReplyRequest, CreateThreadRequest, ReplyResponse, ThreadDetailResponse, ThreadResponse,
};
use crate::services::discussions;

/// `POST /courses/{id}/threads`
pub async fn create_thread_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<CreateThreadRequest>,
) -> AppResult<(StatusCode, Json<ThreadResponse>)> {
    let course_id = path_id(&id, "course")?;
    let thread = discussions::create_thread(&state, &user.0, course_id, body).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// `GET /courses/{id}/threads`
pub async fn list_threads_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ThreadResponse>>> {
    let course_id = path_id(&id, "course")?;
    Ok(Json(discussions::list_threads(&state, &user.0, course_id).await?))
}

/// `GET /threads/{id}`
pub async fn get_thread_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ThreadDetailResponse>> {
    let thread_id = path_id(&id, "thread")?;
    Ok(Json(discussions::get_thread(&state, &user.0, thread_id).await?))
}

/// `POST /threads/{id}/replies`
pub async fn reply_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<CreateReplyRequest>,
) -> AppResult<(StatusCode, Json<ReplyResponse>)> {
    let thread_id = path_id(&id, "thread")?;
    let reply = discussions::reply(&state, &user.0, thread_id, body).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
