use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use supplychainx_models::{AuditAction, NewSupplier, Permission, Supplier};

use super::{deleted, found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct SupplierQuery {
    /// Case-insensitive name fragment.
    pub name: Option<String>,
}

/// GET /api/v1/suppliers
pub async fn list_suppliers(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<SupplierQuery>,
) -> ApiResult<Json<Vec<Supplier>>> {
    user.require(Permission::SupplierRead)?;

    let suppliers = match query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => state.repos.suppliers.search_by_name(name).await?,
        None => state.repos.suppliers.find_all().await?,
    };
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Supplier>> {
    user.require(Permission::SupplierRead)?;
    Ok(Json(found(state.repos.suppliers.find_by_id(id).await?, "Supplier", id)?))
}

pub async fn create_supplier(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(supplier): ValidatedJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    user.require(Permission::SupplierWrite)?;
    let supplier = state.repos.suppliers.create(&supplier).await?;

    audit::record(&state, user.user(), AuditAction::Create, "supplier", Some(supplier.id), snapshot(&supplier)).await;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(supplier): ValidatedJson<NewSupplier>,
) -> ApiResult<Json<Supplier>> {
    user.require(Permission::SupplierWrite)?;
    let supplier = found(state.repos.suppliers.update(id, &supplier).await?, "Supplier", id)?;

    audit::record(&state, user.user(), AuditAction::Update, "supplier", Some(id), snapshot(&supplier)).await;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::SupplierWrite)?;
    deleted(state.repos.suppliers.delete(id).await?, "Supplier", id)?;

    audit::record(&state, user.user(), AuditAction::Delete, "supplier", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
