//! Course request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::path_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, OrgContext};
use crate::models::{CourseDetailResponse, CourseResponse, CreateCourseRequest};
use crate::services::courses;

/// `POST /courses`: org from the body's `orgId`. ORGANIZER only.
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<CourseResponse>)> {
    let course = courses::create_course(&state, &user.0, body).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// `GET /courses`: courses of the org named by `X-Org-ID` or `?orgId=`.
pub async fn list_current_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
) -> AppResult<Json<Vec<CourseResponse>>> {
    Ok(Json(courses::list_for_context(&state, &ctx.0).await?))
}

/// `GET /organizations/{id}/courses`
pub async fn list_by_org_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CourseResponse>>> {
    let org_id = path_id(&id, "organization")?;
    Ok(Json(courses::list_by_org(&state, &user.0, org_id).await?))
}

/// `GET /courses/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CourseDetailResponse>> {
    let course_id = path_id(&id, "course")?;
    Ok(Json(courses::get_course(&state, &user.0, course_id).await?))
}
