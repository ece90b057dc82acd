//! Customer orders. Creating an order reserves product stock; cancelling
//! returns it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use supplychainx_models::{AuditAction, CustomerOrder, NewCustomerOrder, OrderStatus, Permission};

use super::{found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub customer_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

pub async fn list_orders(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<CustomerOrder>>> {
    user.require(Permission::OrderRead)?;
    Ok(Json(state.repos.orders.find_all(query.customer_id, query.status).await?))
}

pub async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CustomerOrder>> {
    user.require(Permission::OrderRead)?;
    Ok(Json(found(state.repos.orders.find_by_id(id).await?, "Order", id)?))
}

pub async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(order): ValidatedJson<NewCustomerOrder>,
) -> ApiResult<(StatusCode, Json<CustomerOrder>)> {
    user.require(Permission::OrderWrite)?;
    let order = state.repos.orders.create(&order).await?;

    audit::record(&state, user.user(), AuditAction::Create, "customer_order", Some(order.id), snapshot(&order)).await;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn cancel_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CustomerOrder>> {
    user.require(Permission::OrderWrite)?;
    let order = state.repos.orders.cancel(id).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "customer_order",
        Some(id),
        json!({ "status": order.status, "released_quantity": order.quantity }),
    )
    .await;
    Ok(Json(order))
}

pub async fn delete_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::OrderWrite)?;
    state.repos.orders.delete(id).await?;

    audit::record(&state, user.user(), AuditAction::Delete, "customer_order", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
