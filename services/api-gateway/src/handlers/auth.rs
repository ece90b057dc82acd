use axum::{extract::State, response::Json};
use serde::Serialize;
use supplychainx_models::{LoginRequest, Permission, User};

use crate::{
    auth::{authenticate, LoginKind},
    error::ApiResult,
    extract::ValidatedJson,
    middleware::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub permissions: Vec<Permission>,
}

impl From<User> for SessionResponse {
    fn from(user: User) -> Self {
        Self {
            permissions: user.role.permissions().to_vec(),
            user,
        }
    }
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let user = authenticate(&state, &request.email, &request.password, LoginKind::Interactive).await?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(Json(user.into()))
}

/// GET /api/v1/auth/me
pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<SessionResponse> {
    Json(user.into())
}
