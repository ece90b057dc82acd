//! Dependencies of the stock alert job.
//!
//! The job only sees these traits; `main` wires the PostgreSQL repositories
//! and a notifier in, tests wire in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use supplychainx_database::{StockAlertRepository, StockLevelRepository};
use supplychainx_models::{StockAlert, StockSnapshot};

/// Current stock of everything that has a minimum.
#[async_trait]
pub trait StockLevelSource: Send + Sync {
    async fn snapshot(&self) -> Result<Vec<StockSnapshot>>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn unresolved(&self) -> Result<Vec<StockAlert>>;

    /// `None` when the entity already has an unresolved alert.
    async fn insert(&self, alert: &StockAlert) -> Result<Option<StockAlert>>;

    async fn resolve(&self, id: i64, resolved_by: &str, comment: &str, at: DateTime<Utc>) -> Result<StockAlert>;

    async fn awaiting_email(&self, include_low: bool) -> Result<Vec<StockAlert>>;

    async fn mark_email_sent(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    async fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &StockAlert) -> Result<()>;
}

#[async_trait]
impl StockLevelSource for StockLevelRepository {
    async fn snapshot(&self) -> Result<Vec<StockSnapshot>> {
        self.snapshot_all().await
    }
}

#[async_trait]
impl AlertStore for StockAlertRepository {
    async fn unresolved(&self) -> Result<Vec<StockAlert>> {
        self.find_unresolved().await
    }

    async fn insert(&self, alert: &StockAlert) -> Result<Option<StockAlert>> {
        StockAlertRepository::insert(self, alert).await
    }

    async fn resolve(&self, id: i64, resolved_by: &str, comment: &str, at: DateTime<Utc>) -> Result<StockAlert> {
        StockAlertRepository::resolve(self, id, resolved_by, Some(comment.to_string()), at).await
    }

    async fn awaiting_email(&self, include_low: bool) -> Result<Vec<StockAlert>> {
        self.find_awaiting_email(include_low).await
    }

    async fn mark_email_sent(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        StockAlertRepository::mark_email_sent(self, id, at).await
    }

    async fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        StockAlertRepository::delete_resolved_before(self, cutoff).await
    }
}
