//! # SupplyChainX Domain Models
//!
//! Entities, request payloads and the business rules of the SupplyChainX
//! platform. Everything here is free of I/O so the rules can be tested
//! without a database.
//!
//! ## Verticals
//!
//! - **Supply**: suppliers, raw materials, supply orders
//! - **Production**: products, bills of material, production orders
//! - **Delivery**: customers, customer orders, deliveries
//! - **Security**: users, roles, permissions, account lockout
//! - **Audit**: hash-chained audit entries, stock alerts
//!
//! ## Business rules
//!
//! - [`classify_stock_level`] grades a shortage as out-of-stock, critical or low
//! - [`check_feasibility`] decides whether material stock covers a production order
//! - [`User::register_failed_login`] applies the account lockout policy

#[macro_use]
mod text_enum;

pub mod audit;
pub mod delivery;
pub mod feasibility;
pub mod production;
pub mod security;
pub mod stock_alert;
pub mod supply;

#[cfg(test)]
mod property_tests;

pub use audit::*;
pub use delivery::*;
pub use feasibility::*;
pub use production::*;
pub use security::{LockoutPolicy, LoginRequest, NewUser, Permission, Role, User, ROLE_PERMISSIONS};
pub use stock_alert::*;
pub use supply::*;

use validator::ValidationError;

/// Returned when a stored or submitted tag matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {type_name} value '{value}'")]
pub struct UnknownVariant {
    pub type_name: &'static str,
    pub value: String,
}

pub(crate) fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone_regex = regex::Regex::new(r"^\+?[\d\s\-\(\)]{7,20}$")
        .map_err(|_| ValidationError::new("phone_pattern"))?;
    if phone_regex.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("+33-6-12-34-56-78").is_ok());
        assert!(validate_phone("(555) 123-4567").is_ok());
        assert!(validate_phone("abc-def-ghij").is_err());
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "SHIPPED".parse::<SupplyOrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown SupplyOrderStatus value 'SHIPPED'");
    }

    #[test]
    fn test_supplier_with_invalid_phone_fails_validation() {
        use validator::Validate;

        let supplier = NewSupplier {
            name: "Acier du Nord".to_string(),
            contact_person: Some("Marc Dupont".to_string()),
            email: Some("marc@acier-nord.fr".to_string()),
            phone: Some("call me".to_string()),
            address: None,
            rating: Some(4.5),
            lead_time_days: Some(10),
        };
        assert!(supplier.validate().is_err());
    }
}
