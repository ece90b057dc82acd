use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supplychainx_models::{AlertAlreadyResolved, FeasibilityError, UnknownVariant};
use thiserror::Error;

use crate::bom::BomImportError;

// PostgreSQL SQLSTATE codes
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SupplyChainError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Business rule violation: {message}")]
    BusinessRule {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Account locked until {locked_until}")]
    AccountLocked { locked_until: DateTime<Utc> },

    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl SupplyChainError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRule {
            message: message.into(),
            details: None,
        }
    }

    pub fn business_rule_with_details(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::BusinessRule {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn account_locked(locked_until: DateTime<Utc>) -> Self {
        Self::AccountLocked { locked_until }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::BusinessRule { .. } => "BUSINESS_RULE_VIOLATION",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::Authorization { .. } => "AUTHORIZATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Notification { .. } => "NOTIFICATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Database { .. } => 500,
            Self::Validation { .. } => 400,
            Self::BusinessRule { .. } => 422,
            Self::Authentication { .. } => 401,
            Self::AccountLocked { .. } => 423,
            Self::Authorization { .. } => 403,
            Self::Configuration { .. } => 500,
            Self::Notification { .. } => 502,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::BusinessRule { details, .. } => details.clone(),
            Self::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            Self::AccountLocked { locked_until } => {
                Some(serde_json::json!({ "locked_until": locked_until }))
            }
            _ => None,
        }
    }
}

pub type SupplyChainResult<T> = Result<T, SupplyChainError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<SupplyChainError> for ErrorResponse {
    fn from(error: SupplyChainError) -> Self {
        Self {
            error: error.error_code().to_lowercase(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: error.details(),
        }
    }
}

impl From<sqlx::Error> for SupplyChainError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("record"),
            sqlx::Error::Database(db_error) => match db_error.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => Self::conflict(format!(
                    "referenced record is missing or still in use: {}",
                    db_error.message()
                )),
                Some(UNIQUE_VIOLATION) => {
                    Self::conflict(format!("duplicate value: {}", db_error.message()))
                }
                Some(CHECK_VIOLATION) => Self::business_rule(db_error.message().to_string()),
                _ => Self::database(error.to_string()),
            },
            _ => Self::database(error.to_string()),
        }
    }
}

/// Recovers typed errors carried inside an `anyhow::Error` returned by a
/// repository, falling back to `Internal`.
impl From<anyhow::Error> for SupplyChainError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<SupplyChainError>() {
            Ok(domain) => return domain,
            Err(error) => error,
        };
        let error = match error.downcast::<FeasibilityError>() {
            Ok(feasibility) => return feasibility.into(),
            Err(error) => error,
        };
        let error = match error.downcast::<AlertAlreadyResolved>() {
            Ok(resolved) => return resolved.into(),
            Err(error) => error,
        };
        match error.downcast::<sqlx::Error>() {
            Ok(sql) => sql.into(),
            Err(error) => Self::internal(format!("{:#}", error)),
        }
    }
}

impl From<FeasibilityError> for SupplyChainError {
    fn from(error: FeasibilityError) -> Self {
        match &error {
            FeasibilityError::InvalidQuantity(_) | FeasibilityError::RequirementOverflow { .. } => {
                Self::validation("quantity", error.to_string())
            }
            FeasibilityError::InsufficientStock(shortfalls) => {
                let details = serde_json::json!({
                    "shortfalls": shortfalls
                        .iter()
                        .map(|s| serde_json::json!({
                            "material_id": s.material_id,
                            "material_name": s.material_name,
                            "required": s.required,
                            "available": s.available,
                            "missing": s.missing(),
                        }))
                        .collect::<Vec<_>>()
                });
                Self::business_rule_with_details(error.to_string(), details)
            }
        }
    }
}

impl From<AlertAlreadyResolved> for SupplyChainError {
    fn from(error: AlertAlreadyResolved) -> Self {
        Self::conflict(error.to_string())
    }
}

impl From<UnknownVariant> for SupplyChainError {
    fn from(error: UnknownVariant) -> Self {
        Self::validation(error.type_name, error.to_string())
    }
}

impl From<BomImportError> for SupplyChainError {
    fn from(error: BomImportError) -> Self {
        Self::validation("file", error.to_string())
    }
}

impl From<serde_json::Error> for SupplyChainError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}
