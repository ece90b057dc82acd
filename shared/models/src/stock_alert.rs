//! Stock alert domain models.
//!
//! A stock alert records a shortage on a raw material or a product. Its
//! resolution and email-notification state are optional sub-records, so a
//! resolved alert can never exist without a resolver and a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Severity of a shortage, most severe first.
    pub enum StockLevel {
        OutOfStock => "OUT_OF_STOCK",
        Critical => "CRITICAL",
        Low => "LOW",
    }
}

text_enum! {
    /// Kind of entity an alert is raised against.
    pub enum StockedEntityType {
        RawMaterial => "RAW_MATERIAL",
        Product => "PRODUCT",
    }
}

impl StockLevel {
    /// Out-of-stock and critical shortages escalate; low stock does not.
    pub fn is_critical(&self) -> bool {
        matches!(self, StockLevel::OutOfStock | StockLevel::Critical)
    }
}

/// Returns true when `current_stock` is below the configured minimum.
pub fn is_shortage(current_stock: i32, minimum_stock: i32) -> bool {
    current_stock < minimum_stock
}

/// Classifies a shortage.
///
/// Only meaningful when [`is_shortage`] holds. The critical threshold uses
/// integer division, so with a minimum of 10 a stock of 4 is critical and a
/// stock of 5 is low.
pub fn classify_stock_level(current_stock: i32, minimum_stock: i32) -> StockLevel {
    if current_stock <= 0 {
        StockLevel::OutOfStock
    } else if current_stock < minimum_stock / 2 {
        StockLevel::Critical
    } else {
        StockLevel::Low
    }
}

/// Who resolved an alert, when, and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertResolution {
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Point-in-time stock reading for one stocked entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSnapshot {
    pub entity_type: StockedEntityType,
    pub entity_id: i64,
    pub entity_name: String,
    pub current_stock: i32,
    pub minimum_stock: i32,
}

impl StockSnapshot {
    pub fn is_shortage(&self) -> bool {
        is_shortage(self.current_stock, self.minimum_stock)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlert {
    pub id: i64,
    pub level: StockLevel,
    pub entity_type: StockedEntityType,
    pub entity_id: i64,
    pub entity_name: String,
    pub message: String,
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub resolution: Option<AlertResolution>,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockAlert {
    /// Builds an unsaved alert (id 0) for a shortage snapshot.
    pub fn raise(snapshot: &StockSnapshot) -> Self {
        let level = classify_stock_level(snapshot.current_stock, snapshot.minimum_stock);
        let now = Utc::now();
        Self {
            id: 0,
            level,
            entity_type: snapshot.entity_type,
            entity_id: snapshot.entity_id,
            entity_name: snapshot.entity_name.clone(),
            message: Self::describe(level, snapshot),
            current_stock: snapshot.current_stock,
            minimum_stock: snapshot.minimum_stock,
            resolution: None,
            email_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn describe(level: StockLevel, snapshot: &StockSnapshot) -> String {
        let subject = match snapshot.entity_type {
            StockedEntityType::RawMaterial => "Raw material",
            StockedEntityType::Product => "Product",
        };
        match level {
            StockLevel::OutOfStock => format!(
                "{} '{}' is out of stock (minimum {})",
                subject, snapshot.entity_name, snapshot.minimum_stock
            ),
            StockLevel::Critical => format!(
                "{} '{}' is critically low: {} left, minimum {}",
                subject, snapshot.entity_name, snapshot.current_stock, snapshot.minimum_stock
            ),
            StockLevel::Low => format!(
                "{} '{}' is below minimum: {} left, minimum {}",
                subject, snapshot.entity_name, snapshot.current_stock, snapshot.minimum_stock
            ),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.level.is_critical()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn is_email_sent(&self) -> bool {
        self.email_sent_at.is_some()
    }

    /// Marks the alert resolved. Fails if it was already resolved.
    pub fn resolve(
        &mut self,
        resolved_by: impl Into<String>,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), AlertAlreadyResolved> {
        if self.is_resolved() {
            return Err(AlertAlreadyResolved { alert_id: self.id });
        }
        self.resolution = Some(AlertResolution {
            resolved_by: resolved_by.into(),
            resolved_at: at,
            comment,
        });
        self.updated_at = at;
        Ok(())
    }

    pub fn mark_email_sent(&mut self, at: DateTime<Utc>) {
        self.email_sent_at = Some(at);
        self.updated_at = at;
    }

    /// Whether the alert still waits for an email, given the notification policy.
    pub fn awaits_email(&self, notify_low_stock: bool) -> bool {
        !self.is_resolved() && !self.is_email_sent() && (notify_low_stock || self.is_critical())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stock alert {alert_id} is already resolved")]
pub struct AlertAlreadyResolved {
    pub alert_id: i64,
}

/// Flattened JSON view of an alert, with the derived flags clients filter on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAlertResponse {
    pub id: i64,
    pub level: StockLevel,
    pub critical: bool,
    pub entity_type: StockedEntityType,
    pub entity_id: i64,
    pub entity_name: String,
    pub message: String,
    pub current_stock: i32,
    pub minimum_stock: i32,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_comment: Option<String>,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&StockAlert> for StockAlertResponse {
    fn from(alert: &StockAlert) -> Self {
        Self {
            id: alert.id,
            level: alert.level,
            critical: alert.is_critical(),
            entity_type: alert.entity_type,
            entity_id: alert.entity_id,
            entity_name: alert.entity_name.clone(),
            message: alert.message.clone(),
            current_stock: alert.current_stock,
            minimum_stock: alert.minimum_stock,
            resolved: alert.is_resolved(),
            resolved_by: alert.resolution.as_ref().map(|r| r.resolved_by.clone()),
            resolved_at: alert.resolution.as_ref().map(|r| r.resolved_at),
            resolution_comment: alert.resolution.as_ref().and_then(|r| r.comment.clone()),
            email_sent: alert.is_email_sent(),
            email_sent_at: alert.email_sent_at,
            created_at: alert.created_at,
        }
    }
}

/// Alert counts per severity, used by the dashboard summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StockAlertSummary {
    pub total_unresolved: i64,
    pub out_of_stock: i64,
    pub critical: i64,
    pub low: i64,
    pub pending_email: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(current: i32, minimum: i32) -> StockSnapshot {
        StockSnapshot {
            entity_type: StockedEntityType::RawMaterial,
            entity_id: 7,
            entity_name: "Steel sheet".to_string(),
            current_stock: current,
            minimum_stock: minimum,
        }
    }

    #[test]
    fn test_classification_boundaries_for_minimum_ten() {
        assert_eq!(classify_stock_level(0, 10), StockLevel::OutOfStock);
        assert_eq!(classify_stock_level(4, 10), StockLevel::Critical);
        assert_eq!(classify_stock_level(5, 10), StockLevel::Low);
        assert_eq!(classify_stock_level(9, 10), StockLevel::Low);
    }

    #[test]
    fn test_odd_minimum_uses_integer_division() {
        // 11 / 2 == 5, so 5 is not below the critical threshold
        assert_eq!(classify_stock_level(4, 11), StockLevel::Critical);
        assert_eq!(classify_stock_level(5, 11), StockLevel::Low);
    }

    #[test]
    fn test_minimum_of_one_never_critical() {
        assert_eq!(classify_stock_level(0, 1), StockLevel::OutOfStock);
        assert!(!is_shortage(1, 1));
    }

    #[test]
    fn test_critical_flag() {
        assert!(StockAlert::raise(&snapshot(0, 10)).is_critical());
        assert!(StockAlert::raise(&snapshot(3, 10)).is_critical());
        assert!(!StockAlert::raise(&snapshot(6, 10)).is_critical());
    }

    #[test]
    fn test_raise_describes_shortage() {
        let alert = StockAlert::raise(&snapshot(3, 10));
        assert_eq!(alert.level, StockLevel::Critical);
        assert!(alert.message.contains("Steel sheet"));
        assert!(!alert.is_resolved());
        assert!(!alert.is_email_sent());
    }

    #[test]
    fn test_resolve_sets_resolver_and_timestamp() {
        let mut alert = StockAlert::raise(&snapshot(3, 10));
        let now = Utc::now();
        alert.resolve("planner@supplychainx.io", Some("Reordered".to_string()), now).unwrap();

        let view = StockAlertResponse::from(&alert);
        assert!(view.resolved);
        assert_eq!(view.resolved_at, Some(now));
        assert_eq!(view.resolved_by.as_deref(), Some("planner@supplychainx.io"));
    }

    #[test]
    fn test_unresolved_view_has_no_resolution_fields() {
        let view = StockAlertResponse::from(&StockAlert::raise(&snapshot(3, 10)));
        assert!(!view.resolved);
        assert!(view.resolved_at.is_none());
        assert!(view.resolved_by.is_none());
    }

    #[test]
    fn test_resolving_twice_fails() {
        let mut alert = StockAlert::raise(&snapshot(0, 10));
        alert.resolve("a@b.io", None, Utc::now()).unwrap();
        assert!(alert.resolve("c@d.io", None, Utc::now()).is_err());
        assert_eq!(alert.resolution.unwrap().resolved_by, "a@b.io");
    }

    #[test]
    fn test_awaits_email_policy() {
        let mut low = StockAlert::raise(&snapshot(8, 10));
        assert!(!low.awaits_email(false));
        assert!(low.awaits_email(true));

        low.mark_email_sent(Utc::now());
        assert!(!low.awaits_email(true));
        assert!(StockAlertResponse::from(&low).email_sent_at.is_some());
    }

    #[test]
    fn test_level_round_trips_through_text() {
        for level in StockLevel::ALL {
            assert_eq!(level.as_str().parse::<StockLevel>().unwrap(), *level);
        }
        assert!("unknown".parse::<StockLevel>().is_err());
    }
}
