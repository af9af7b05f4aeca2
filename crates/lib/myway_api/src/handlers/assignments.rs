//! Assignment, submission and grading request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::path_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AssignmentDetailResponse, AssignmentListItem, AssignmentResponse, CreateAssignmentRequest,
    GradeRequest, SubmissionResponse, SubmitRequest,
};
use crate::services::assignments;

/// `POST /courses/{id}/assignments`
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<CreateAssignmentRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    let course_id = path_id(&id, "course")?;
    let assignment = assignments::create(&state, &user.0, course_id, body).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// `GET /courses/{id}/assignments`
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<AssignmentListItem>>> {
    let course_id = path_id(&id, "course")?;
    Ok(Json(assignments::list(&state, &user.0, course_id).await?))
}

/// `GET /assignments/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<AssignmentDetailResponse>> {
    let assignment_id = path_id(&id, "assignment")?;
    Ok(Json(assignments::get(&state, &user.0, assignment_id).await?))
}

/// `POST /assignments/{id}/submissions`: 201 on first submission, 200 on resubmission.
pub async fn submit_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<SubmissionResponse>)> {
    let assignment_id = path_id(&id, "assignment")?;
    let (submission, created) = assignments::submit(&state, &user.0, assignment_id, body).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(submission)))
}

/// `GET /submissions/{id}`
pub async fn get_submission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission_id = path_id(&id, "submission")?;
    Ok(Json(assignments::get_submission(&state, &user.0, submission_id).await?))
}

/// `POST /submissions/{id}/grade`
pub async fn grade_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<GradeRequest>,
) -> AppResult<Json<SubmissionResponse>> {
    let submission_id = path_id(&id, "submission")?;
    Ok(Json(assignments::grade(&state, &user.0, submission_id, body).await?))
}
