//! Delivery domain models: customers, customer orders and deliveries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 255, message = "Customer name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(email(message = "Customer email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(custom = "crate::validate_phone")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

text_enum! {
    pub enum OrderStatus {
        Preparing => "PREPARING",
        InTransit => "IN_TRANSIT",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
}

impl OrderStatus {
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, target),
            (Preparing, InTransit) | (InTransit, Delivered) | (Preparing, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerOrder {
    pub id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewCustomerOrder {
    pub customer_id: i64,
    pub product_id: i64,
    #[validate(range(min = 1, message = "Order quantity must be positive"))]
    pub quantity: i32,
}

text_enum! {
    pub enum DeliveryStatus {
        Planned => "PLANNED",
        InTransit => "IN_TRANSIT",
        Delivered => "DELIVERED",
    }
}

impl DeliveryStatus {
    pub fn can_transition_to(&self, target: DeliveryStatus) -> bool {
        use DeliveryStatus::*;

        matches!((self, target), (Planned, InTransit) | (InTransit, Delivered))
    }

    /// Order status that follows a delivery entering this status, if any.
    pub fn order_status(&self) -> Option<OrderStatus> {
        match self {
            DeliveryStatus::Planned => None,
            DeliveryStatus::InTransit => Some(OrderStatus::InTransit),
            DeliveryStatus::Delivered => Some(OrderStatus::Delivered),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: i64,
    pub order_id: i64,
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    pub planned_date: NaiveDate,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cost: Option<f64>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewDelivery {
    pub order_id: i64,
    #[validate(length(max = 100))]
    pub vehicle: Option<String>,
    #[validate(length(max = 255))]
    pub driver: Option<String>,
    pub planned_date: NaiveDate,
    #[validate(range(min = 0.0, message = "Delivery cost cannot be negative"))]
    pub cost: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions() {
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::InTransit));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::InTransit.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Preparing));
    }

    #[test]
    fn test_delivery_drives_order_status() {
        assert_eq!(DeliveryStatus::Planned.order_status(), None);
        assert_eq!(DeliveryStatus::InTransit.order_status(), Some(OrderStatus::InTransit));
        assert_eq!(DeliveryStatus::Delivered.order_status(), Some(OrderStatus::Delivered));
        assert!(!DeliveryStatus::Planned.can_transition_to(DeliveryStatus::Delivered));
    }

    #[test]
    fn test_new_customer_validation() {
        let customer = NewCustomer {
            name: "Atelier Nord".to_string(),
            email: Some("not-an-email".to_string()),
            phone: None,
            address: None,
            city: Some("Lille".to_string()),
        };
        assert!(customer.validate().is_err());
    }
}
