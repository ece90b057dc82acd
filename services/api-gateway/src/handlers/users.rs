//! User administration. Every route needs `user:manage`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::json;
use supplychainx_models::{AuditAction, NewUser, Permission, Role, User};
use supplychainx_utils::{validate_password_strength, SupplyChainError};

use super::{deleted, found, snapshot};
use crate::{
    audit,
    auth::password::hash_password,
    error::ApiResult,
    extract::ValidatedJson,
    middleware::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct EnabledUpdate {
    pub enabled: bool,
}

pub async fn list_users(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<User>>> {
    caller.require(Permission::UserManage)?;
    Ok(Json(state.repos.users.find_all().await?))
}

pub async fn get_user(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    caller.require(Permission::UserManage)?;
    let user = found(state.repos.users.find_by_id(id).await?, "User", id)?;
    Ok(Json(user))
}

pub async fn create_user(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(new_user): ValidatedJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require(Permission::UserManage)?;
    validate_password_strength(&new_user.password, state.config.security.min_password_length)?;

    let password_hash = hash_password(&new_user.password)
        .map_err(|e| SupplyChainError::internal(format!("Failed to hash password: {}", e)))?;

    let user = state
        .repos
        .users
        .create(
            &new_user.first_name,
            &new_user.last_name,
            &new_user.email,
            &password_hash,
            new_user.role,
        )
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User created");
    audit::record(&state, caller.user(), AuditAction::Create, "user", Some(user.id), snapshot(&user)).await;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_role(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<RoleUpdate>,
) -> ApiResult<Json<User>> {
    caller.require(Permission::UserManage)?;
    if id == caller.user().id && update.role != Role::Admin && caller.user().role == Role::Admin {
        return Err(SupplyChainError::business_rule("Administrators cannot demote themselves").into());
    }

    let user = found(state.repos.users.update_role(id, update.role).await?, "User", id)?;
    audit::record(
        &state,
        caller.user(),
        AuditAction::Update,
        "user",
        Some(id),
        json!({ "role": user.role }),
    )
    .await;
    Ok(Json(user))
}

pub async fn set_enabled(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<EnabledUpdate>,
) -> ApiResult<Json<User>> {
    caller.require(Permission::UserManage)?;
    if id == caller.user().id && !update.enabled {
        return Err(SupplyChainError::business_rule("Users cannot disable their own account").into());
    }

    let user = found(state.repos.users.set_enabled(id, update.enabled).await?, "User", id)?;
    audit::record(
        &state,
        caller.user(),
        AuditAction::Update,
        "user",
        Some(id),
        json!({ "enabled": user.enabled }),
    )
    .await;
    Ok(Json(user))
}

pub async fn unlock_user(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    caller.require(Permission::UserManage)?;
    let user = found(state.repos.users.unlock(id).await?, "User", id)?;

    tracing::info!(user_id = id, "Account unlocked");
    audit::record(&state, caller.user(), AuditAction::Update, "user", Some(id), json!({ "unlocked": true })).await;
    Ok(Json(user))
}

pub async fn delete_user(
    caller: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    caller.require(Permission::UserManage)?;
    if id == caller.user().id {
        return Err(SupplyChainError::business_rule("Users cannot delete their own account").into());
    }

    deleted(state.repos.users.delete(id).await?, "User", id)?;
    audit::record(&state, caller.user(), AuditAction::Delete, "user", Some(id), json!({})).await;
    Ok(StatusCode::NO_CONTENT)
}
