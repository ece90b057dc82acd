use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use supplychainx_database::StockAlertFilter;
use supplychainx_models::{AuditAction, Permission, StockAlertResponse, StockAlertSummary};
use supplychainx_utils::clamp_limit;
use validator::Validate;

use super::found;
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub resolved: Option<bool>,
    /// Only out-of-stock and critical alerts when true.
    pub critical: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResolveAlertRequest {
    #[validate(length(max = 1000, message = "Resolution comment is limited to 1000 characters"))]
    pub comment: Option<String>,
}

/// GET /api/v1/stock-alerts
pub async fn list_alerts(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Json<Vec<StockAlertResponse>>> {
    user.require(Permission::AlertRead)?;

    let filter = StockAlertFilter {
        resolved: query.resolved,
        critical: query.critical,
        limit: Some(clamp_limit(query.limit, 500, 5000)),
    };
    let alerts = state.repos.alerts.find_all(&filter).await?;
    Ok(Json(alerts.iter().map(StockAlertResponse::from).collect()))
}

/// GET /api/v1/stock-alerts/summary
pub async fn summary(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<StockAlertSummary>> {
    user.require(Permission::AlertRead)?;
    Ok(Json(state.repos.alerts.summary().await?))
}

pub async fn get_alert(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StockAlertResponse>> {
    user.require(Permission::AlertRead)?;
    let alert = found(state.repos.alerts.find_by_id(id).await?, "Stock alert", id)?;
    Ok(Json(StockAlertResponse::from(&alert)))
}

/// POST /api/v1/stock-alerts/:id/resolve
///
/// The caller becomes the resolver. A second resolution is a 409.
pub async fn resolve_alert(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<ResolveAlertRequest>,
) -> ApiResult<Json<StockAlertResponse>> {
    user.require(Permission::AlertResolve)?;

    let comment = request.comment.filter(|c| !c.trim().is_empty());
    let alert = state
        .repos
        .alerts
        .resolve(id, &user.user().email, comment.clone(), Utc::now())
        .await?;

    tracing::info!(alert_id = id, resolved_by = %user.user().email, "Stock alert resolved");
    audit::record(
        &state,
        user.user(),
        AuditAction::AlertResolved,
        "stock_alert",
        Some(id),
        json!({ "entity_type": alert.entity_type, "entity_id": alert.entity_id, "comment": comment }),
    )
    .await;
    Ok(Json(StockAlertResponse::from(&alert)))
}
