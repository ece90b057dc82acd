//! The stock alert job: stock check, email dispatch and retention cleanup.
//!
//! Each run is independent. Re-running a step never raises a second alert
//! for the same entity, never mails an alert twice and only deletes what is
//! past retention.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use supplychainx_models::{StockAlert, StockedEntityType};
use supplychainx_utils::SchedulerConfig;

use crate::ports::{AlertNotifier, AlertStore, StockLevelSource};

pub const SYSTEM_RESOLVER: &str = "system";
pub const REPLENISHED_COMMENT: &str = "Stock replenished above minimum";
pub const ENTITY_REMOVED_COMMENT: &str = "Stocked entity no longer exists";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSettings {
    /// Mail low-stock alerts too, not only critical ones.
    pub notify_low_stock: bool,
    pub retention: Duration,
}

impl From<&SchedulerConfig> for JobSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            notify_low_stock: config.notify_low_stock,
            retention: Duration::days(config.resolved_alert_retention_days),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockCheckReport {
    pub checked: usize,
    pub shortages: usize,
    pub raised: usize,
    pub already_open: usize,
    pub auto_resolved: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cutoff: DateTime<Utc>,
    pub deleted: u64,
}

pub struct StockAlertJob {
    source: Arc<dyn StockLevelSource>,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn AlertNotifier>,
    settings: JobSettings,
}

impl StockAlertJob {
    pub fn new(
        source: Arc<dyn StockLevelSource>,
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn AlertNotifier>,
        settings: JobSettings,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            settings,
        }
    }

    /// Raises an alert for every new shortage and resolves open alerts whose
    /// entity is back above its minimum.
    pub async fn check_stock_levels(&self, now: DateTime<Utc>) -> Result<StockCheckReport> {
        let snapshots = self.source.snapshot().await.context("Failed to read stock levels")?;
        let mut open: HashMap<(StockedEntityType, i64), StockAlert> = self
            .store
            .unresolved()
            .await
            .context("Failed to read unresolved alerts")?
            .into_iter()
            .map(|alert| ((alert.entity_type, alert.entity_id), alert))
            .collect();

        let mut report = StockCheckReport {
            checked: snapshots.len(),
            ..Default::default()
        };

        for snapshot in &snapshots {
            let existing = open.remove(&(snapshot.entity_type, snapshot.entity_id));

            if snapshot.is_shortage() {
                report.shortages += 1;
                if existing.is_some() {
                    report.already_open += 1;
                    continue;
                }

                match self.store.insert(&StockAlert::raise(snapshot)).await {
                    Ok(Some(alert)) => {
                        tracing::info!(
                            alert_id = alert.id,
                            level = %alert.level,
                            entity_type = %alert.entity_type,
                            entity_id = alert.entity_id,
                            current_stock = alert.current_stock,
                            minimum_stock = alert.minimum_stock,
                            "Stock alert raised"
                        );
                        report.raised += 1;
                    }
                    // another run got there first
                    Ok(None) => report.already_open += 1,
                    Err(e) => {
                        tracing::error!(
                            entity_type = %snapshot.entity_type,
                            entity_id = snapshot.entity_id,
                            error = %e,
                            "Failed to raise stock alert"
                        );
                        report.failed += 1;
                    }
                }
            } else if let Some(alert) = existing {
                self.auto_resolve(&alert, REPLENISHED_COMMENT, now, &mut report).await;
            }
        }

        // open alerts left over belong to entities that were deleted
        for alert in open.values() {
            self.auto_resolve(alert, ENTITY_REMOVED_COMMENT, now, &mut report).await;
        }

        Ok(report)
    }

    async fn auto_resolve(&self, alert: &StockAlert, comment: &str, now: DateTime<Utc>, report: &mut StockCheckReport) {
        match self.store.resolve(alert.id, SYSTEM_RESOLVER, comment, now).await {
            Ok(_) => {
                tracing::info!(alert_id = alert.id, entity_id = alert.entity_id, comment, "Stock alert auto-resolved");
                report.auto_resolved += 1;
            }
            Err(e) => {
                tracing::warn!(alert_id = alert.id, error = %e, "Failed to auto-resolve stock alert");
                report.failed += 1;
            }
        }
    }

    /// Mails every unresolved alert that has not been mailed yet. A failed
    /// send leaves the alert pending for the next run.
    pub async fn dispatch_pending_emails(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let pending = self
            .store
            .awaiting_email(self.settings.notify_low_stock)
            .await
            .context("Failed to read alerts awaiting email")?;

        let mut report = DispatchReport {
            pending: pending.len(),
            ..Default::default()
        };

        for alert in &pending {
            if let Err(e) = self.notifier.notify(alert).await {
                tracing::warn!(alert_id = alert.id, error = %e, "Failed to send stock alert email");
                report.failed += 1;
                continue;
            }

            match self.store.mark_email_sent(alert.id, now).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    tracing::error!(alert_id = alert.id, error = %e, "Alert email sent but not recorded");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Deletes resolved alerts older than the retention period.
    pub async fn cleanup_resolved_alerts(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let cutoff = now - self.settings.retention;
        let deleted = self
            .store
            .delete_resolved_before(cutoff)
            .await
            .context("Failed to delete resolved alerts")?;

        Ok(CleanupReport { cutoff, deleted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use supplychainx_models::{StockLevel, StockSnapshot};

    #[derive(Default)]
    struct FakeSource {
        snapshots: Mutex<Vec<StockSnapshot>>,
    }

    impl FakeSource {
        fn set(&self, snapshots: Vec<StockSnapshot>) {
            *self.snapshots.lock().unwrap() = snapshots;
        }
    }

    #[async_trait]
    impl StockLevelSource for FakeSource {
        async fn snapshot(&self) -> Result<Vec<StockSnapshot>> {
            Ok(self.snapshots.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        alerts: Mutex<Vec<StockAlert>>,
    }

    impl FakeStore {
        fn all(&self) -> Vec<StockAlert> {
            self.alerts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertStore for FakeStore {
        async fn unresolved(&self) -> Result<Vec<StockAlert>> {
            Ok(self.all().into_iter().filter(|a| !a.is_resolved()).collect())
        }

        async fn insert(&self, alert: &StockAlert) -> Result<Option<StockAlert>> {
            let mut alerts = self.alerts.lock().unwrap();
            let duplicate = alerts.iter().any(|a| {
                !a.is_resolved() && a.entity_type == alert.entity_type && a.entity_id == alert.entity_id
            });
            if duplicate {
                return Ok(None);
            }
            let mut stored = alert.clone();
            stored.id = alerts.len() as i64 + 1;
            alerts.push(stored.clone());
            Ok(Some(stored))
        }

        async fn resolve(&self, id: i64, resolved_by: &str, comment: &str, at: DateTime<Utc>) -> Result<StockAlert> {
            let mut alerts = self.alerts.lock().unwrap();
            let alert = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| anyhow!("alert {} not found", id))?;
            alert.resolve(resolved_by, Some(comment.to_string()), at)?;
            Ok(alert.clone())
        }

        async fn awaiting_email(&self, include_low: bool) -> Result<Vec<StockAlert>> {
            Ok(self.all().into_iter().filter(|a| a.awaits_email(include_low)).collect())
        }

        async fn mark_email_sent(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
            let mut alerts = self.alerts.lock().unwrap();
            match alerts.iter_mut().find(|a| a.id == id && !a.is_email_sent()) {
                Some(alert) => {
                    alert.mark_email_sent(at);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            let mut alerts = self.alerts.lock().unwrap();
            let before = alerts.len();
            alerts.retain(|a| !matches!(&a.resolution, Some(r) if r.resolved_at < cutoff));
            Ok((before - alerts.len()) as u64)
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        failing: Mutex<bool>,
        sent: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl AlertNotifier for FakeNotifier {
        async fn notify(&self, alert: &StockAlert) -> Result<()> {
            if *self.failing.lock().unwrap() {
                return Err(anyhow!("SMTP relay unavailable"));
            }
            self.sent.lock().unwrap().push(alert.id);
            Ok(())
        }
    }

    struct Harness {
        source: Arc<FakeSource>,
        store: Arc<FakeStore>,
        notifier: Arc<FakeNotifier>,
        job: StockAlertJob,
    }

    fn harness(notify_low_stock: bool) -> Harness {
        let source = Arc::new(FakeSource::default());
        let store = Arc::new(FakeStore::default());
        let notifier = Arc::new(FakeNotifier::default());
        let job = StockAlertJob::new(
            source.clone(),
            store.clone(),
            notifier.clone(),
            JobSettings {
                notify_low_stock,
                retention: Duration::days(30),
            },
        );
        Harness {
            source,
            store,
            notifier,
            job,
        }
    }

    fn material(id: i64, current: i32, minimum: i32) -> StockSnapshot {
        StockSnapshot {
            entity_type: StockedEntityType::RawMaterial,
            entity_id: id,
            entity_name: format!("material-{}", id),
            current_stock: current,
            minimum_stock: minimum,
        }
    }

    #[tokio::test]
    async fn test_stock_check_raises_one_alert_per_shortage() {
        let h = harness(false);
        h.source.set(vec![material(1, 0, 10), material(2, 4, 10), material(3, 9, 10), material(4, 50, 10)]);

        let report = h.job.check_stock_levels(Utc::now()).await.unwrap();
        assert_eq!(report.checked, 4);
        assert_eq!(report.shortages, 3);
        assert_eq!(report.raised, 3);

        let levels: Vec<StockLevel> = h.store.all().iter().map(|a| a.level).collect();
        assert_eq!(levels, vec![StockLevel::OutOfStock, StockLevel::Critical, StockLevel::Low]);
    }

    #[tokio::test]
    async fn test_stock_check_is_idempotent() {
        let h = harness(false);
        h.source.set(vec![material(1, 2, 10)]);

        h.job.check_stock_levels(Utc::now()).await.unwrap();
        let second = h.job.check_stock_levels(Utc::now()).await.unwrap();

        assert_eq!(second.raised, 0);
        assert_eq!(second.already_open, 1);
        assert_eq!(h.store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_replenished_stock_resolves_as_system() {
        let h = harness(false);
        h.source.set(vec![material(1, 2, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();

        h.source.set(vec![material(1, 12, 10)]);
        let report = h.job.check_stock_levels(Utc::now()).await.unwrap();
        assert_eq!(report.auto_resolved, 1);

        let alert = &h.store.all()[0];
        let resolution = alert.resolution.as_ref().unwrap();
        assert_eq!(resolution.resolved_by, SYSTEM_RESOLVER);
        assert_eq!(resolution.comment.as_deref(), Some(REPLENISHED_COMMENT));
    }

    #[tokio::test]
    async fn test_new_shortage_after_resolution_raises_again() {
        let h = harness(false);
        h.source.set(vec![material(1, 2, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();
        h.source.set(vec![material(1, 12, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();
        h.source.set(vec![material(1, 0, 10)]);

        let report = h.job.check_stock_levels(Utc::now()).await.unwrap();
        assert_eq!(report.raised, 1);
        assert_eq!(h.store.all().len(), 2);
    }

    #[tokio::test]
    async fn test_alert_for_removed_entity_is_resolved() {
        let h = harness(false);
        h.source.set(vec![material(1, 2, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();

        h.source.set(Vec::new());
        let report = h.job.check_stock_levels(Utc::now()).await.unwrap();
        assert_eq!(report.auto_resolved, 1);
        let alert = &h.store.all()[0];
        assert_eq!(
            alert.resolution.as_ref().and_then(|r| r.comment.as_deref()),
            Some(ENTITY_REMOVED_COMMENT)
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_critical_only_by_default() {
        let h = harness(false);
        h.source.set(vec![material(1, 0, 10), material(2, 8, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();

        let report = h.job.dispatch_pending_emails(Utc::now()).await.unwrap();
        assert_eq!(report, DispatchReport { pending: 1, sent: 1, failed: 0 });
        assert_eq!(*h.notifier.sent.lock().unwrap(), vec![1]);

        // nothing left to send
        let again = h.job.dispatch_pending_emails(Utc::now()).await.unwrap();
        assert_eq!(again.pending, 0);
    }

    #[tokio::test]
    async fn test_dispatch_includes_low_stock_when_enabled() {
        let h = harness(true);
        h.source.set(vec![material(1, 0, 10), material(2, 8, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();

        let report = h.job.dispatch_pending_emails(Utc::now()).await.unwrap();
        assert_eq!(report.sent, 2);
    }

    #[tokio::test]
    async fn test_failed_send_stays_pending() {
        let h = harness(false);
        h.source.set(vec![material(1, 0, 10)]);
        h.job.check_stock_levels(Utc::now()).await.unwrap();

        *h.notifier.failing.lock().unwrap() = true;
        let report = h.job.dispatch_pending_emails(Utc::now()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!h.store.all()[0].is_email_sent());

        *h.notifier.failing.lock().unwrap() = false;
        let retry = h.job.dispatch_pending_emails(Utc::now()).await.unwrap();
        assert_eq!(retry.sent, 1);
        assert!(h.store.all()[0].is_email_sent());
    }

    #[tokio::test]
    async fn test_cleanup_respects_retention() {
        let h = harness(false);
        let now = Utc::now();
        h.source.set(vec![material(1, 0, 10), material(2, 0, 10)]);
        h.job.check_stock_levels(now).await.unwrap();

        h.store.resolve(1, "planner@supplychainx.io", "restocked", now - Duration::days(31)).await.unwrap();
        h.store.resolve(2, "planner@supplychainx.io", "restocked", now - Duration::days(29)).await.unwrap();

        let report = h.job.cleanup_resolved_alerts(now).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.cutoff, now - Duration::days(30));

        let remaining = h.store.all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);
    }

    #[tokio::test]
    async fn test_unresolved_alerts_survive_cleanup() {
        let h = harness(false);
        h.source.set(vec![material(1, 0, 10)]);
        h.job.check_stock_levels(Utc::now() - Duration::days(90)).await.unwrap();

        let report = h.job.cleanup_resolved_alerts(Utc::now()).await.unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(h.store.all().len(), 1);
    }
}
