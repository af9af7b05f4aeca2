//! Course, module and material service.

use myway_core::access::{AccessContext, OrgTarget, parse_org_hint};
use myway_core::models::auth::{Identity, Role};
use myway_core::models::course::{MaterialKind, NewCourse, NewMaterial, NewModule};
use myway_core::repo::CatalogRepository;
use myway_core::tenancy::ownership::ResourceRef;
use tracing::info;
use uuid::Uuid;

use super::{optional, required};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    CourseDetailResponse, CourseResponse, CreateCourseRequest, CreateMaterialRequest,
    CreateModuleRequest, MaterialResponse, ModuleDetailResponse, ModuleResponse,
};

/// Create a course in the body's `orgId`. ORGANIZER only.
pub async fn create_course(
    state: &AppState,
    user: &Identity,
    body: CreateCourseRequest,
) -> AppResult<CourseResponse> {
    let org_id = parse_org_hint(body.org_id.as_deref())?;
    let ctx = state
        .gate()
        .authorize(user.clone(), OrgTarget::Direct(org_id), Role::ORGANIZER_ONLY)
        .await?;

    let course = state
        .store
        .create_course(NewCourse {
            org_id: ctx.org_id,
            code: required(&body.code, "code")?,
            title: required(&body.title, "title")?,
            description: optional(body.description).unwrap_or_default(),
            created_by: user.principal_id,
        })
        .await?;
    info!(course_id = %course.id, org_id = %ctx.org_id, "course created");
    Ok(course.into())
}

/// A course with its modules and active assignments.
pub async fn get_course(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
) -> AppResult<CourseDetailResponse> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Course(course_id)), Role::ALL)
        .await?;
    let course = state
        .store
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".into()))?;
    let modules = state.store.list_modules(course_id).await?;
    let assignments = state.store.list_active_assignments(course_id).await?;
    Ok(CourseDetailResponse {
        course: course.into(),
        modules: modules.into_iter().map(Into::into).collect(),
        assignments: assignments.into_iter().map(Into::into).collect(),
    })
}

pub async fn list_by_org(
    state: &AppState,
    user: &Identity,
    org_id: Uuid,
) -> AppResult<Vec<CourseResponse>> {
    let ctx = state
        .gate()
        .authorize(user.clone(), OrgTarget::Direct(org_id), Role::ALL)
        .await?;
    list_for_context(state, &ctx).await
}

/// Courses of an already granted org context.
pub async fn list_for_context(state: &AppState, ctx: &AccessContext) -> AppResult<Vec<CourseResponse>> {
    Ok(state
        .store
        .list_courses(ctx.org_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Append a module to a course. TEACHER or ORGANIZER.
///
/// Without an explicit position the module goes after the current last one.
pub async fn create_module(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
    body: CreateModuleRequest,
) -> AppResult<ModuleResponse> {
    state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Course(course_id)),
            Role::INSTRUCTORS,
        )
        .await?;
    let title = required(&body.title, "title")?;
    let position = match body.position {
        Some(p) if p < 0 => return Err(AppError::Validation("position must not be negative".into())),
        Some(p) => p,
        None => state
            .store
            .list_modules(course_id)
            .await?
            .iter()
            .map(|m| m.position)
            .max()
            .map_or(1, |last| last + 1),
    };
    let module = state
        .store
        .create_module(NewModule {
            course_id,
            title,
            position,
        })
        .await?;
    info!(module_id = %module.id, %course_id, "module created");
    Ok(module.into())
}

pub async fn list_modules(
    state: &AppState,
    user: &Identity,
    course_id: Uuid,
) -> AppResult<Vec<ModuleResponse>> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Course(course_id)), Role::ALL)
        .await?;
    Ok(state
        .store
        .list_modules(course_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub async fn get_module(
    state: &AppState,
    user: &Identity,
    module_id: Uuid,
) -> AppResult<ModuleDetailResponse> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Module(module_id)), Role::ALL)
        .await?;
    let module = state
        .store
        .find_module(module_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Module not found".into()))?;
    let materials = state.store.list_materials(module_id).await?;
    Ok(ModuleDetailResponse {
        module: module.into(),
        materials: materials.into_iter().map(Into::into).collect(),
    })
}

/// Attach a material to a module. TEACHER or ORGANIZER.
pub async fn create_material(
    state: &AppState,
    user: &Identity,
    module_id: Uuid,
    body: CreateMaterialRequest,
) -> AppResult<MaterialResponse> {
    state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Module(module_id)),
            Role::INSTRUCTORS,
        )
        .await?;
    let kind: MaterialKind = body
        .kind
        .trim()
        .to_uppercase()
        .parse()
        .map_err(|_| AppError::Validation("kind must be one of VIDEO, TEXT, DOC".into()))?;
    let material = state
        .store
        .create_material(NewMaterial {
            module_id,
            kind,
            title: required(&body.title, "title")?,
            source_url: optional(body.source_url),
        })
        .await?;
    info!(material_id = %material.id, %module_id, "material created");
    Ok(material.into())
}

pub async fn list_materials(
    state: &AppState,
    user: &Identity,
    module_id: Uuid,
) -> AppResult<Vec<MaterialResponse>> {
    state
        .gate()
        .authorize(user.clone(), OrgTarget::Resource(ResourceRef::Module(module_id)), Role::ALL)
        .await?;
    Ok(state
        .store
        .list_materials(module_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub async fn get_material(
    state: &AppState,
    user: &Identity,
    material_id: Uuid,
) -> AppResult<MaterialResponse> {
    state
        .gate()
        .authorize(
            user.clone(),
            OrgTarget::Resource(ResourceRef::Material(material_id)),
            Role::ALL,
        )
        .await?;
    state
        .store
        .find_material(material_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound("Material not found".into()))
}
