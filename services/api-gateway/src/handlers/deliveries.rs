use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use supplychainx_models::{AuditAction, Delivery, DeliveryStatus, NewDelivery, Permission};

use super::{found, snapshot, StatusUpdate};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct DeliveryQuery {
    pub status: Option<DeliveryStatus>,
}

pub async fn list_deliveries(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<DeliveryQuery>,
) -> ApiResult<Json<Vec<Delivery>>> {
    user.require(Permission::DeliveryRead)?;
    Ok(Json(state.repos.deliveries.find_all(query.status).await?))
}

pub async fn get_delivery(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Delivery>> {
    user.require(Permission::DeliveryRead)?;
    Ok(Json(found(state.repos.deliveries.find_by_id(id).await?, "Delivery", id)?))
}

pub async fn create_delivery(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(delivery): ValidatedJson<NewDelivery>,
) -> ApiResult<(StatusCode, Json<Delivery>)> {
    user.require(Permission::DeliveryWrite)?;
    let delivery = state.repos.deliveries.create(&delivery).await?;

    audit::record(&state, user.user(), AuditAction::Create, "delivery", Some(delivery.id), snapshot(&delivery)).await;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// PUT /api/v1/deliveries/:id/status
///
/// The delivery's order follows it into `IN_TRANSIT` and `DELIVERED`.
pub async fn update_status(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate<DeliveryStatus>>,
) -> ApiResult<Json<Delivery>> {
    user.require(Permission::DeliveryWrite)?;
    let delivery = state.repos.deliveries.update_status(id, update.status).await?;

    audit::record(
        &state,
        user.user(),
        AuditAction::StatusChange,
        "delivery",
        Some(id),
        json!({ "status": delivery.status, "order_id": delivery.order_id }),
    )
    .await;
    Ok(Json(delivery))
}

pub async fn delete_delivery(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::DeliveryWrite)?;
    state.repos.deliveries.delete(id).await?;

    audit::record(&state, user.user(), AuditAction::Delete, "delivery", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
