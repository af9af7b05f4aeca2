//! Module and material request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::path_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    CreateMaterialRequest, CreateModuleRequest, MaterialResponse, ModuleDetailResponse,
    ModuleResponse,
};
use crate::services::courses;

/// `POST /courses/{id}/modules`
pub async fn create_module_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<CreateModuleRequest>,
) -> AppResult<(StatusCode, Json<ModuleResponse>)> {
    let course_id = path_id(&id, "course")?;
    let module = courses::create_module(&state, &user.0, course_id, body).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// `GET /courses/{id}/modules`
pub async fn list_modules_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ModuleResponse>>> {
    let course_id = path_id(&id, "course")?;
    Ok(Json(courses::list_modules(&state, &user.0, course_id).await?))
}

/// `GET /modules/{id}`
pub async fn get_module_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ModuleDetailResponse>> {
    let module_id = path_id(&id, "module")?;
    Ok(Json(courses::get_module(&state, &user.0, module_id).await?))
}

/// `POST /modules/{id}/materials`
pub async fn create_material_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<CreateMaterialRequest>,
) -> AppResult<(StatusCode, Json<MaterialResponse>)> {
    let module_id = path_id(&id, "module")?;
    let material = courses::create_material(&state, &user.0, module_id, body).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

/// `GET /modules/{id}/materials`
pub async fn list_materials_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<MaterialResponse>>> {
    let module_id = path_id(&id, "module")?;
    Ok(Json(courses::list_materials(&state, &user.0, module_id).await?))
}

/// `GET /materials/{id}`
pub async fn get_material_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<MaterialResponse>> {
    let material_id = path_id(&id, "material")?;
    Ok(Json(courses::get_material(&state, &user.0, material_id).await?))
}
