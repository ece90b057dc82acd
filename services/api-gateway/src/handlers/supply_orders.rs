use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use supplychainx_models::{AuditAction, NewSupplyOrder, Permission, SupplyOrder, SupplyOrderStatus};

use super::{found, snapshot, StatusUpdate};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct SupplyOrderQuery {
    pub status: Option<SupplyOrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct SupplyOrderResponse {
    #[serde(flatten)]
    pub order: SupplyOrder,
    pub total_cost: f64,
}

impl From<SupplyOrder> for SupplyOrderResponse {
    fn from(order: SupplyOrder) -> Self {
        Self {
            total_cost: order.total_cost(),
            order,
        }
    }
}

pub async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<SupplyOrderQuery>,
) -> ApiResult<Json<Vec<SupplyOrderResponse>>> {
    user.require(Permission::SupplyOrderRead)?;
    let orders = state.repos.supply_orders.find_all(query.status).await?;
    Ok(Json(orders.into_iter().map(SupplyOrderResponse::from).collect()))
}

pub async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SupplyOrderResponse>> {
    user.require(Permission::SupplyOrderRead)?;
    let order = found(state.repos.supply_orders.find_by_id(id).await?, "Supply order", id)?;
    Ok(Json(order.into()))
}

pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(order): ValidatedJson<NewSupplyOrder>,
) -> ApiResult<(StatusCode, Json<SupplyOrderResponse>)> {
    user.require(Permission::SupplyOrderWrite)?;
    let order = state.repos.supply_orders.create(&order).await?;

    tracing::info!(order_id = order.id, supplier_id = order.supplier_id, lines = order.lines.len(), "Supply order created");
    audit::record(&state, user.user(), AuditAction::Create, "supply_order", Some(order.id), snapshot(&order)).await;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// PUT /api/v1/supply-orders/:id/status
///
/// Moving to `RECEIVED` credits every line's quantity to its material.
pub async fn update_status(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate<SupplyOrderStatus>>,
) -> ApiResult<Json<SupplyOrderResponse>> {
    user.require(Permission::SupplyOrderWrite)?;
    let order = state.repos.supply_orders.update_status(id, update.status).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "supply_order",
        Some(id),
        json!({ "status": order.status }),
    )
    .await;
    Ok(Json(order.into()))
}

pub async fn delete_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::SupplyOrderWrite)?;
    state.repos.supply_orders.delete(id).await?;

    audit::record(&state, user.user(), AuditAction::Delete, "supply_order", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
