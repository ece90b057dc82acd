pub mod audit;
pub mod auth;
pub mod customers;
pub mod deliveries;
pub mod health;
pub mod orders;
pub mod production_orders;
pub mod products;
pub mod raw_materials;
pub mod stock_alerts;
pub mod suppliers;
pub mod supply_orders;
pub mod users;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use supplychainx_utils::SupplyChainError;

use crate::error::ApiResult;

/// Body of the `PUT …/status` endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

pub(crate) fn found<T>(value: Option<T>, resource: &str, id: i64) -> ApiResult<T> {
    value.ok_or_else(|| SupplyChainError::not_found(format!("{} {}", resource, id)).into())
}

pub(crate) fn deleted(removed: bool, resource: &str, id: i64) -> ApiResult<()> {
    if removed {
        Ok(())
    } else {
        Err(SupplyChainError::not_found(format!("{} {}", resource, id)).into())
    }
}

/// Entity as audit details.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
