//! Assignment, submission and grading service.

use std::collections::HashMap;

use chrono::Utc;
use myway_core::access::OrgTarget;
use myway_core::models::auth::{Identity, Role};
use myway_core::models::course::{AssignmentStatus, NewAssignment, Submission};
use myway_core::repo::CatalogRepository;
use myway_core::tenancy::ownership::ResourceRef;
use tracing::{info, warn};
use uuid::Uuid;

use super::{optional, required};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    AssignmentDetailResponse, AssignmentListItem, AssignmentResponse, CreateAssignmentRequest,
    GradeRequest, SubmissionResponse, SubmitRequest,
};

const NOT_STARTED: &str = "NOT_STARTED";

/// Progress label for the caller's own submission, if any.
fn progress(submission: Option<&Submission>) -> String {
    submission.map_or(NOT_STARTED, |s| s.status.as_str()).to_string()
}

/// Create an assignment under a course. TEACHER or ORGANIZER.
pub async fn create(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
    body: CreateAssignmentRequest,
) -> AppResult<AssignmentResponse> {
    state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Course(course_id)),
            Role::INSTRUCTORS,
        )
        .await?;
    let title = required(&body.title, "title")?;
    if body.points <= 0 {
        return Err(AppError::Validation("points must be positive".into()));
    }
    let assignment = state
        .store
        .create_assignment(NewAssignment {
            course_id,
            title,
            due_at: body.due_at,
            points: body.points,
            instructions: optional(body.instructions).unwrap_or_default(),
        })
        .await?;
    info!(assignment_id = %assignment.id, %course_id, created_by = %user.principal_id, "assignment created");
    Ok(assignment.into())
}

/// Active assignments of a course with the caller's own progress on each.
pub async fn list(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
) -> AppResult<Vec<AssignmentListItem>> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Course(course_id)), Role::ALL)
        .await?;
    let assignments = state.store.list_active_assignments(course_id).await?;
    let mine: HashMap<Uuid, Submission> = state
        .store
        .list_submissions_by_user(user.principal_id)
        .await?
        .into_iter()
        .map(|s| (s.assignment_id, s))
        .collect();
    Ok(assignments
        .into_iter()
        .map(|a| AssignmentListItem {
            submission_status: progress(mine.get(&a.id)),
            assignment: a.into(),
        })
        .collect())
}

/// An assignment with submissions: all of them for instructors, only the
/// caller's own for students.
pub async fn get(
    state: &AppState,
    user: &Identity,
    assignment_id: Uuid,
) -> AppResult<AssignmentDetailResponse> {
    let ctx = state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Assignment(assignment_id)),
            Role::ALL,
        )
        .await?;
    let assignment = state
        .store
        .find_assignment(assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
    let submissions = state
        .store
        .list_submissions(assignment_id)
        .await?
        .into_iter()
        .filter(|s| ctx.is_instructor() || s.user_id == user.principal_id)
        .map(Into::into)
        .collect();
    Ok(AssignmentDetailResponse {
        assignment: assignment.into(),
        submissions,
    })
}

/// Submit (or resubmit) the caller's own work. Returns the row and whether it
/// was newly created.
pub async fn submit(
    state: &AppState,
    user: &Identity,
    assignment_id: Uuid,
    body: SubmitRequest,
) -> AppResult<(SubmissionResponse, bool)> {
    state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Assignment(assignment_id)),
            Role::ALL,
        )
        .await?;
    let assignment = state
        .store
        .find_assignment(assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
    if assignment.status == AssignmentStatus::Archived {
        return Err(AppError::Validation("Assignment is archived".into()));
    }
    let (submission, created) = state
        .store
        .upsert_submission(assignment_id, user.principal_id, optional(body.file_url), Utc::now())
        .await?;
    info!(submission_id = %submission.id, %assignment_id, user_id = %user.principal_id, created, "submission recorded");
    Ok((submission.into(), created))
}

/// A submission, visible to its author and to instructors of the owning org.
pub async fn get_submission(
    state: &AppState,
    user: &Identity,
    submission_id: Uuid,
) -> AppResult<SubmissionResponse> {
    let ctx = state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Submission(submission_id)),
            Role::ALL,
        )
        .await?;
    let submission = state
        .store
        .find_submission(submission_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;
    if submission.user_id != user.principal_id && !ctx.is_instructor() {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(submission.into())
}

/// Grade a submission. TEACHER or ORGANIZER of the organization owning the
/// submission's course; the score must lie within `0..=points`.
pub async fn grade(
    state: &AppState,
    user: &Identity,
    submission_id: Uuid,
    body: GradeRequest,
) -> AppResult<SubmissionResponse> {
    let ctx = state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Submission(submission_id)),
            Role::INSTRUCTORS,
        )
        .await?;

    let not_found = || AppError::NotFound("Submission not found".into());
    let submission = state
        .store
        .find_submission(submission_id)
        .await?
        .ok_or_else(not_found)?;
    let assignment = state
        .store
        .find_assignment(submission.assignment_id)
        .await?
        .ok_or_else(not_found)?;
    let course = state
        .store
        .find_course(assignment.course_id)
        .await?
        .ok_or_else(not_found)?;
    if course.org_id != ctx.org_id {
        warn!(%submission_id, granted_org = %ctx.org_id, owning_org = %course.org_id, "grade org mismatch");
        return Err(AppError::Forbidden("Access denied".into()));
    }

    if !(0..=assignment.points).contains(&body.grade) {
        return Err(AppError::Validation(format!(
            "grade must be between 0 and {}",
            assignment.points
        )));
    }
    let graded = state
        .store
        .grade_submission(submission_id, body.grade, optional(body.feedback))
        .await?;
    info!(%submission_id, grader = %user.principal_id, grade = body.grade, "submission graded");
    Ok(graded.into())
}
