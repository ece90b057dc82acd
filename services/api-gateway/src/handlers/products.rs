//! Products and their bills of material.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::json;
use supplychainx_models::{AuditAction, BillOfMaterial, NewBillOfMaterial, NewProduct, Permission, Product};
use supplychainx_utils::{BomParser, SupplyChainError};

use super::{deleted, found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Serialize)]
pub struct BomImportResponse {
    pub product_id: i64,
    pub imported: usize,
    pub lines: Vec<BillOfMaterial>,
}

pub async fn list_products(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Product>>> {
    user.require(Permission::ProductRead)?;
    Ok(Json(state.repos.products.find_all().await?))
}

pub async fn get_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    user.require(Permission::ProductRead)?;
    Ok(Json(found(state.repos.products.find_by_id(id).await?, "Product", id)?))
}

pub async fn create_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(product): ValidatedJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require(Permission::ProductWrite)?;
    let product = state.repos.products.create(&product).await?;

    audit::record(&state, user.user(), AuditAction::Create, "product", Some(product.id), snapshot(&product)).await;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(product): ValidatedJson<NewProduct>,
) -> ApiResult<Json<Product>> {
    user.require(Permission::ProductWrite)?;
    let product = found(state.repos.products.update(id, &product).await?, "Product", id)?;

    audit::record(&state, user.user(), AuditAction::Update, "product", Some(id), snapshot(&product)).await;
    Ok(Json(product))
}

pub async fn delete_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ProductWrite)?;
    deleted(state.repos.products.delete(id).await?, "Product", id)?;

    audit::record(&state, user.user(), AuditAction::Delete, "product", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/products/:id/bom
pub async fn list_bom(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<Vec<BillOfMaterial>>> {
    user.require(Permission::ProductRead)?;
    found(state.repos.products.find_by_id(product_id).await?, "Product", product_id)?;
    Ok(Json(state.repos.bom.find_by_product(product_id).await?))
}

pub async fn add_bom_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    ValidatedJson(line): ValidatedJson<NewBillOfMaterial>,
) -> ApiResult<(StatusCode, Json<BillOfMaterial>)> {
    user.require(Permission::ProductWrite)?;
    let line = state.repos.bom.add(product_id, &line).await?;

    audit::record(&state, user.user(), AuditAction::Create, "bill_of_material", Some(line.id), snapshot(&line)).await;
    Ok((StatusCode::CREATED, Json(line)))
}

/// POST /api/v1/products/:id/bom/import
///
/// Body is CSV with a `material_id,quantity_per_unit,unit` header. Any
/// malformed row rejects the whole file.
pub async fn import_bom(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BomImportResponse>)> {
    user.require(Permission::ProductWrite)?;

    let parsed = BomParser::new().parse_csv(&body).map_err(SupplyChainError::from)?;
    let lines = state.repos.bom.import(product_id, &parsed.into_lines()).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::Import,
        "bill_of_material",
        Some(product_id),
        json!({ "product_id": product_id, "lines": lines.len() }),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(BomImportResponse {
            product_id,
            imported: lines.len(),
            lines,
        }),
    ))
}

pub async fn delete_bom_line(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path((product_id, line_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ProductWrite)?;
    deleted(state.repos.bom.delete(product_id, line_id).await?, "BOM line", line_id)?;

    audit::record(
        &state,
        user.user(),
        AuditAction::Delete,
        "bill_of_material",
        Some(line_id),
        json!({ "product_id": product_id }),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
