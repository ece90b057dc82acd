use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use supplychainx_models::{AuditAction, NewRawMaterial, Permission, RawMaterial};

use super::{deleted, found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

pub async fn list_materials(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RawMaterial>>> {
    user.require(Permission::MaterialRead)?;
    Ok(Json(state.repos.materials.find_all().await?))
}

/// GET /api/v1/raw-materials/low-stock
///
/// Materials whose stock is below their minimum, lowest stock first.
pub async fn list_below_minimum(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RawMaterial>>> {
    user.require(Permission::MaterialRead)?;
    Ok(Json(state.repos.materials.find_below_minimum().await?))
}

pub async fn get_material(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RawMaterial>> {
    user.require(Permission::MaterialRead)?;
    Ok(Json(found(state.repos.materials.find_by_id(id).await?, "Raw material", id)?))
}

pub async fn create_material(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(material): ValidatedJson<NewRawMaterial>,
) -> ApiResult<(StatusCode, Json<RawMaterial>)> {
    user.require(Permission::MaterialWrite)?;
    let material = state.repos.materials.create(&material).await?;

    audit::record(&state, user.user(), AuditAction::Create, "raw_material", Some(material.id), snapshot(&material)).await;
    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn update_material(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(material): ValidatedJson<NewRawMaterial>,
) -> ApiResult<Json<RawMaterial>> {
    user.require(Permission::MaterialWrite)?;
    let material = found(state.repos.materials.update(id, &material).await?, "Raw material", id)?;

    audit::record(&state, user.user(), AuditAction::Update, "raw_material", Some(id), snapshot(&material)).await;
    Ok(Json(material))
}

pub async fn delete_material(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::MaterialWrite)?;
    deleted(state.repos.materials.delete(id).await?, "Raw material", id)?;

    audit::record(&state, user.user(), AuditAction::Delete, "raw_material", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
