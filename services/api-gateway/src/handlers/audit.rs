use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use supplychainx_database::AuditFilter;
use supplychainx_models::{AuditEntry, ChainVerification, Permission};
use supplychainx_utils::clamp_limit;

use crate::{error::ApiResult, middleware::AuthenticatedUser, AppState};

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/audit
pub async fn list_entries(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    user.require(Permission::AuditRead)?;

    let filter = AuditFilter {
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        limit: Some(clamp_limit(query.limit, 100, 1000)),
    };
    Ok(Json(state.repos.audit.find(&filter).await?))
}

/// GET /api/v1/audit/verify
pub async fn verify(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<ChainVerification>> {
    user.require(Permission::AuditRead)?;
    Ok(Json(state.repos.audit.verify_chain().await?))
}
