use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use supplychainx_utils::{ErrorResponse, SupplyChainError};

/// Handler error: a domain error rendered as the JSON error body.
#[derive(Debug)]
pub struct ApiError(pub SupplyChainError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<SupplyChainError> for ApiError {
    fn from(error: SupplyChainError) -> Self {
        Self(error)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self(SupplyChainError::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), error = %self.0, "Request failed");
        } else {
            tracing::debug!(code = self.0.error_code(), error = %self.0, "Request rejected");
        }

        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplychainx_models::{FeasibilityError, MaterialShortfall};

    #[test]
    fn test_status_follows_error_variant() {
        let response = ApiError(SupplyChainError::not_found("Supplier 7")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let locked = ApiError(SupplyChainError::account_locked(chrono::Utc::now())).into_response();
        assert_eq!(locked.status(), StatusCode::LOCKED);
    }

    #[test]
    fn test_shortage_inside_anyhow_becomes_422() {
        let error = anyhow::Error::new(FeasibilityError::InsufficientStock(vec![MaterialShortfall {
            material_id: 1,
            material_name: "Oak plank".to_string(),
            required: 20,
            available: 15,
        }]))
        .context("Failed to start production order");

        let response = ApiError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
