//! Course discussion threads. Any active member of the course's organization
//! may read and post.

use myway_core::access::OrgTarget;
use myway_core::models::auth::{Identity, Role};
use myway_core::repo::CatalogRepository;
use myway_core::tenancy::ownership::ResourceRef;
use tracing::info;
use uuid::Uuid;

use super::required;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateReplyRequest, CreateThreadRequest, ReplyResponse, ThreadDetailResponse, ThreadResponse,
};

pub async fn create_thread(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
    body: CreateThreadRequest,
) -> AppResult<ThreadResponse> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Course(course_id)), Role::ALL)
        .await?;
    let title = required(&body.title, "title")?;
    let text = required(&body.body, "body")?;
    let thread = state
        .store
        .create_thread(course_id, user.principal_id, &title, &text)
        .await?;
    info!(thread_id = %thread.id, %course_id, "thread created");
    Ok(thread.into())
}

/// Newest first.
pub async fn list_threads(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
) -> AppResult<Vec<ThreadResponse>> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Course(course_id)), Role::ALL)
        .await?;
    Ok(state
        .store
        .list_threads(course_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub async fn get_thread(
    state: &AppState,
    user: &Identity,
    thread_id: Uuid,
) -> AppResult<ThreadDetailResponse> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Thread(thread_id)), Role::ALL)
        .await?;
    let thread = state
        .store
        .find_thread(thread_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Thread not found".into()))?;
    let replies = state.store.list_replies(thread_id).await?;
    Ok(ThreadDetailResponse {
        thread: thread.into(),
        replies: replies.into_iter().map(Into::into).collect(),
    })
}

pub async fn reply(
    state: &AppState,
    user: &Identity,
    thread_id: Uuid,
    body: CreateReplyRequest,
) -> AppResult<ReplyResponse> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Thread(thread_id)), Role::ALL)
        .await?;
    let text = required(&body.body, "body")?;
    let reply = state
        .store
        .create_reply(thread_id, user.principal_id, &text)
        .await?;
    Ok(reply.into())
}
