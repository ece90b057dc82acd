use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use supplychainx_models::{Permission, User};
use supplychainx_utils::SupplyChainError;

use crate::{
    auth::{authenticate, LoginKind},
    error::{ApiError, ApiResult},
    AppState,
};

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_PASSWORD_HEADER: &str = "x-user-password";

/// Caller authenticated from the `X-User-Email` / `X-User-Password` headers.
///
/// ```ignore
/// async fn list(user: AuthenticatedUser, State(state): State<AppState>) -> ApiResult<Json<..>> {
///     user.require(Permission::SupplierRead)?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn require(&self, permission: Permission) -> ApiResult<()> {
        if self.0.has_permission(permission) {
            return Ok(());
        }
        tracing::debug!(user_id = self.0.id, role = %self.0.role, %permission, "Permission denied");
        Err(SupplyChainError::authorization(format!(
            "Role {} lacks permission {}",
            self.0.role, permission
        ))
        .into())
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let email = header(parts, USER_EMAIL_HEADER)?;
        let password = header(parts, USER_PASSWORD_HEADER)?;

        let user = authenticate(state, &email, &password, LoginKind::Request).await?;
        Ok(Self(user))
    }
}

fn header(parts: &Parts, name: &str) -> ApiResult<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SupplyChainError::authentication(format!("Missing {} header", name)).into())
}
