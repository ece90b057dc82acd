use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::json;
use supplychainx_models::{AuditAction, Customer, NewCustomer, Permission};

use super::{deleted, found, snapshot};
use crate::{audit, error::ApiResult, extract::ValidatedJson, middleware::AuthenticatedUser, AppState};

pub async fn list_customers(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Customer>>> {
    user.require(Permission::CustomerRead)?;
    Ok(Json(state.repos.customers.find_all().await?))
}

pub async fn get_customer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Customer>> {
    user.require(Permission::CustomerRead)?;
    Ok(Json(found(state.repos.customers.find_by_id(id).await?, "Customer", id)?))
}

pub async fn create_customer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(customer): ValidatedJson<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    user.require(Permission::CustomerWrite)?;
    let customer = state.repos.customers.create(&customer).await?;

    audit::record(&state, user.user(), AuditAction::Create, "customer", Some(customer.id), snapshot(&customer)).await;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(customer): ValidatedJson<NewCustomer>,
) -> ApiResult<Json<Customer>> {
    user.require(Permission::CustomerWrite)?;
    let customer = found(state.repos.customers.update(id, &customer).await?, "Customer", id)?;

    audit::record(&state, user.user(), AuditAction::Update, "customer", Some(id), snapshot(&customer)).await;
    Ok(Json(customer))
}

pub async fn delete_customer(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    user.require(Permission::CustomerWrite)?;
    deleted(state.repos.customers.delete(id).await?, "Customer", id)?;

    audit::record(&state, user.user(), AuditAction::Delete, "customer", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
