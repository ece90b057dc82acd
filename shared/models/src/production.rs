//! Production domain models: products, bills of material and production orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::stock_alert::{StockSnapshot, StockedEntityType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub production_time_hours: Option<f64>,
    pub unit_cost: Option<f64>,
    pub stock: i32,
    pub min_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot {
            entity_type: StockedEntityType::Product,
            entity_id: self.id,
            entity_name: self.name.clone(),
            current_stock: self.stock,
            minimum_stock: self.min_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255, message = "Product name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Production time cannot be negative"))]
    pub production_time_hours: Option<f64>,
    #[validate(range(min = 0.0, message = "Unit cost cannot be negative"))]
    pub unit_cost: Option<f64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: i32,
}

/// One line of a product's bill of materials.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BillOfMaterial {
    pub id: i64,
    pub product_id: i64,
    pub raw_material_id: i64,
    pub quantity_per_unit: i32,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

/// Upper bound on BOM quantities per unit and production order quantities.
/// Keeps aggregated requirements far inside `i64`.
pub const MAX_QUANTITY: i32 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewBillOfMaterial {
    pub raw_material_id: i64,
    #[validate(range(min = 1, max = 1_000_000, message = "Quantity per unit must be between 1 and 1000000"))]
    pub quantity_per_unit: i32,
    #[validate(length(min = 1, max = 20, message = "Unit of measure is required"))]
    pub unit: String,
}

text_enum! {
    pub enum ProductionOrderStatus {
        Planned => "PLANNED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

impl ProductionOrderStatus {
    pub fn can_transition_to(&self, target: ProductionOrderStatus) -> bool {
        use ProductionOrderStatus::*;

        matches!(
            (self, target),
            (Planned, InProgress) | (InProgress, Completed) | (Planned, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductionOrderStatus::Completed | ProductionOrderStatus::Cancelled)
    }
}

text_enum! {
    pub enum ProductionPriority {
        Standard => "STANDARD",
        Urgent => "URGENT",
    }
}

impl Default for ProductionPriority {
    fn default() -> Self {
        ProductionPriority::Standard
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionOrder {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub priority: ProductionPriority,
    pub status: ProductionOrderStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductionOrder {
    /// Estimated duration from the product's per-unit production time.
    pub fn estimated_hours(&self, product: &Product) -> Option<f64> {
        product
            .production_time_hours
            .map(|hours| hours * f64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewProductionOrder {
    pub product_id: i64,
    #[validate(range(min = 1, max = 1_000_000, message = "Production quantity must be between 1 and 1000000"))]
    pub quantity: i32,
    #[serde(default)]
    pub priority: ProductionPriority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_transitions() {
        use ProductionOrderStatus::*;

        assert!(Planned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Planned.can_transition_to(Completed));
    }

    #[test]
    fn test_priority_defaults_to_standard() {
        let order: NewProductionOrder =
            serde_json::from_str(r#"{"product_id": 3, "quantity": 12}"#).unwrap();
        assert_eq!(order.priority, ProductionPriority::Standard);
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_quantities_are_bounded() {
        let order = NewProductionOrder {
            product_id: 3,
            quantity: MAX_QUANTITY + 1,
            priority: ProductionPriority::Standard,
        };
        assert!(order.validate().is_err());

        let line = NewBillOfMaterial {
            raw_material_id: 1,
            quantity_per_unit: i32::MAX,
            unit: "kg".to_string(),
        };
        assert!(line.validate().is_err());

        let line = NewBillOfMaterial {
            quantity_per_unit: MAX_QUANTITY,
            ..line
        };
        assert!(line.validate().is_ok());
    }

    #[test]
    fn test_status_parses_case_insensitively() {
        assert_eq!(
            "in_progress".parse::<ProductionOrderStatus>().unwrap(),
            ProductionOrderStatus::InProgress
        );
    }

    #[test]
    fn test_estimated_hours() {
        let now = Utc::now();
        let product = Product {
            id: 1,
            name: "Chair".to_string(),
            description: None,
            production_time_hours: Some(1.5),
            unit_cost: None,
            stock: 0,
            min_stock: 0,
            created_at: now,
            updated_at: now,
        };
        let order = ProductionOrder {
            id: 1,
            product_id: 1,
            quantity: 4,
            priority: ProductionPriority::Urgent,
            status: ProductionOrderStatus::Planned,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(order.estimated_hours(&product), Some(6.0));
    }
}
