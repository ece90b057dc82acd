//! Production orders.
//!
//! `start` is the only route that consumes raw material: the repository runs
//! the feasibility check and the stock decrement in one transaction, and a
//! shortage comes back as a 422 listing every missing material.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use supplychainx_models::{
    AuditAction, FeasibilityReport, NewProductionOrder, Permission, ProductionOrder, ProductionOrderStatus,
};

use super::{found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct ProductionOrderQuery {
    pub status: Option<ProductionOrderStatus>,
}

pub async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<ProductionOrderQuery>,
) -> ApiResult<Json<Vec<ProductionOrder>>> {
    user.require(Permission::ProductionOrderRead)?;
    Ok(Json(state.repos.production_orders.find_all(query.status).await?))
}

pub async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Permission::ProductionOrderRead)?;
    Ok(Json(found(state.repos.production_orders.find_by_id(id).await?, "Production order", id)?))
}

pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(order): ValidatedJson<NewProductionOrder>,
) -> ApiResult<(StatusCode, Json<ProductionOrder>)> {
    user.require(Permission::ProductionOrderWrite)?;
    let order = state.repos.production_orders.create(&order).await?;

    audit::record(&state, user.user(), AuditAction::Create, "production_order", Some(order.id), snapshot(&order)).await;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/v1/production-orders/:id/feasibility
pub async fn feasibility(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FeasibilityReport>> {
    user.require(Permission::ProductionOrderRead)?;
    Ok(Json(state.repos.production_orders.feasibility(id).await?))
}

/// POST /api/v1/production-orders/:id/start
pub async fn start_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Permission::ProductionOrderWrite)?;
    let order = state.repos.production_orders.start(id).await?;

    tracing::info!(order_id = id, product_id = order.product_id, quantity = order.quantity, "Production started");
    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "production_order",
        Some(id),
        json!({ "status": order.status, "started_at": order.started_at }),
    )
    .await;
    Ok(Json(order))
}

pub async fn complete_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Permission::ProductionOrderWrite)?;
    let order = state.repos.production_orders.complete(id).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "production_order",
        Some(id),
        json!({ "status": order.status, "completed_at": order.completed_at }),
    )
    .await;
    Ok(Json(order))
}

pub async fn cancel_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductionOrder>> {
    user.require(Permission::ProductionOrderWrite)?;
    let order = state.repos.production_orders.cancel(id).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "production_order",
        Some(id),
        json!({ "status": order.status }),
    )
    .await;
    Ok(Json(order))
}

pub async fn delete_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::ProductionOrderWrite)?;
    state.repos.production_orders.delete(id).await?;

    audit::record(&state, user.user(), AuditAction::Delete, "production_order", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
