//! Supply domain models: suppliers, raw materials and supply orders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::stock_alert::{StockSnapshot, StockedEntityType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub lead_time_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewSupplier {
    #[validate(length(min = 1, max = 255, message = "Supplier name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Supplier email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(custom = "crate::validate_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    #[validate(range(min = 0, max = 365, message = "Lead time must be between 0 and 365 days"))]
    pub lead_time_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RawMaterial {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub stock: i32,
    pub min_stock: i32,
    pub supplier_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawMaterial {
    pub fn is_below_minimum(&self) -> bool {
        self.stock < self.min_stock
    }

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            entity_type: StockedEntityType::RawMaterial,
            entity_id: self.id,
            entity_name: self.name.clone(),
            current_stock: self.stock,
            minimum_stock: self.min_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewRawMaterial {
    #[validate(length(min = 1, max = 255, message = "Material name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Unit of measure is required"))]
    pub unit: String,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: i32,
    pub supplier_id: Option<i64>,
}

text_enum! {
    pub enum SupplyOrderStatus {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Received => "RECEIVED",
        Cancelled => "CANCELLED",
    }
}

impl SupplyOrderStatus {
    pub fn can_transition_to(&self, target: SupplyOrderStatus) -> bool {
        use SupplyOrderStatus::*;

        matches!(
            (self, target),
            (Pending, InProgress) | (Pending, Received) | (InProgress, Received) | (Pending, Cancelled) | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SupplyOrderStatus::Received | SupplyOrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplyOrderLine {
    pub id: i64,
    pub raw_material_id: i64,
    pub quantity: i32,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplyOrder {
    pub id: i64,
    pub supplier_id: i64,
    pub status: SupplyOrderStatus,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub received_at: Option<DateTime<Utc>>,
    pub lines: Vec<SupplyOrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplyOrder {
    pub fn total_cost(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.unit_price.unwrap_or(0.0) * f64::from(l.quantity))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewSupplyOrderLine {
    pub raw_material_id: i64,
    #[validate(range(min = 1, message = "Line quantity must be positive"))]
    pub quantity: i32,
    #[validate(range(min = 0.0, message = "Unit price cannot be negative"))]
    pub unit_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewSupplyOrder {
    pub supplier_id: i64,
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    #[validate(
        length(min = 1, message = "A supply order needs at least one line"),
        custom = "validate_order_lines"
    )]
    pub lines: Vec<NewSupplyOrderLine>,
}

fn validate_order_lines(lines: &[NewSupplyOrderLine]) -> Result<(), ValidationError> {
    if lines.iter().any(|line| line.validate().is_err()) {
        return Err(ValidationError::new("invalid_order_line"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_order_transitions() {
        use SupplyOrderStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Received));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Received.is_terminal());
    }

    #[test]
    fn test_total_cost_ignores_unpriced_lines() {
        let now = Utc::now();
        let order = SupplyOrder {
            id: 1,
            supplier_id: 1,
            status: SupplyOrderStatus::Pending,
            order_date: now.date_naive(),
            expected_date: None,
            received_at: None,
            lines: vec![
                SupplyOrderLine { id: 1, raw_material_id: 1, quantity: 4, unit_price: Some(2.5) },
                SupplyOrderLine { id: 2, raw_material_id: 2, quantity: 3, unit_price: None },
            ],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(order.total_cost(), 10.0);
    }

    #[test]
    fn test_new_supply_order_requires_lines() {
        let order = NewSupplyOrder {
            supplier_id: 1,
            order_date: None,
            expected_date: None,
            lines: vec![],
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_new_raw_material_rejects_negative_stock() {
        let material = NewRawMaterial {
            name: "Copper wire".to_string(),
            description: None,
            unit: "m".to_string(),
            stock: -1,
            min_stock: 10,
            supplier_id: None,
        };
        assert!(material.validate().is_err());
    }
}
