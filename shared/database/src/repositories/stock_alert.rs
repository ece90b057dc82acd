//! Stock Alert Repository
//!
//! Alerts are inserted by the stock check, mutated only by resolution and
//! email dispatch, and deleted only by retention cleanup. At most one
//! unresolved alert exists per entity (partial unique index).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use supplychainx_models::{AlertResolution, StockAlert, StockAlertSummary};
use supplychainx_utils::SupplyChainError;

const COLUMNS: &str = "id, level, entity_type, entity_id, entity_name, message, current_stock, minimum_stock, \
                       resolved, resolved_by, resolved_at, resolution_comment, email_sent, email_sent_at, \
                       created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct StockAlertFilter {
    pub resolved: Option<bool>,
    pub critical: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct StockAlertRepository {
    pool: PgPool,
}

impl StockAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<StockAlert>> {
        let row: Option<StockAlertRow> =
            sqlx::query_as(&format!("SELECT {} FROM stock_alerts WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch stock alert by ID")?;

        row.map(StockAlert::try_from).transpose()
    }

    /// Newest first.
    pub async fn find_all(&self, filter: &StockAlertFilter) -> Result<Vec<StockAlert>> {
        let rows: Vec<StockAlertRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM stock_alerts
            WHERE ($1::BOOLEAN IS NULL OR resolved = $1)
              AND ($2::BOOLEAN IS NULL OR (level IN ('OUT_OF_STOCK', 'CRITICAL')) = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            COLUMNS
        ))
        .bind(filter.resolved)
        .bind(filter.critical)
        .bind(filter.limit.unwrap_or(500))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch stock alerts")?;

        rows.into_iter().map(StockAlert::try_from).collect()
    }

    pub async fn find_unresolved(&self) -> Result<Vec<StockAlert>> {
        self.find_all(&StockAlertFilter {
            resolved: Some(false),
            critical: None,
            limit: Some(i64::MAX),
        })
        .await
    }

    pub async fn summary(&self) -> Result<StockAlertSummary> {
        let row: SummaryRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_unresolved,
                COUNT(*) FILTER (WHERE level = 'OUT_OF_STOCK') AS out_of_stock,
                COUNT(*) FILTER (WHERE level = 'CRITICAL') AS critical,
                COUNT(*) FILTER (WHERE level = 'LOW') AS low,
                COUNT(*) FILTER (WHERE NOT email_sent) AS pending_email
            FROM stock_alerts
            WHERE NOT resolved
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to summarize stock alerts")?;

        Ok(StockAlertSummary {
            total_unresolved: row.total_unresolved,
            out_of_stock: row.out_of_stock,
            critical: row.critical,
            low: row.low,
            pending_email: row.pending_email,
        })
    }

    /// Inserts a new unresolved alert. Returns `None` when the entity already
    /// has one.
    pub async fn insert(&self, alert: &StockAlert) -> Result<Option<StockAlert>> {
        let row: Option<StockAlertRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO stock_alerts
                (level, entity_type, entity_id, entity_name, message, current_stock, minimum_stock,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (entity_type, entity_id) WHERE NOT resolved DO NOTHING
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(alert.level.as_str())
        .bind(alert.entity_type.as_str())
        .bind(alert.entity_id)
        .bind(&alert.entity_name)
        .bind(&alert.message)
        .bind(alert.current_stock)
        .bind(alert.minimum_stock)
        .bind(alert.created_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to insert stock alert")?;

        row.map(StockAlert::try_from).transpose()
    }

    /// Resolves an alert. Resolving an already resolved alert fails with
    /// `AlertAlreadyResolved`.
    pub async fn resolve(
        &self,
        id: i64,
        resolved_by: &str,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<StockAlert> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row: Option<StockAlertRow> = sqlx::query_as(&format!(
            "SELECT {} FROM stock_alerts WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock stock alert")?;
        let mut alert: StockAlert = match row {
            Some(row) => row.try_into()?,
            None => return Err(SupplyChainError::not_found(format!("Stock alert {}", id)).into()),
        };

        alert.resolve(resolved_by, comment, at)?;

        sqlx::query(
            r#"
            UPDATE stock_alerts SET
                resolved = TRUE, resolved_by = $2, resolved_at = $3, resolution_comment = $4, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(resolved_by)
        .bind(at)
        .bind(alert.resolution.as_ref().and_then(|r| r.comment.as_deref()))
        .execute(&mut *tx)
        .await
        .context("Failed to resolve stock alert")?;

        tx.commit().await.context("Failed to commit stock alert resolution")?;
        Ok(alert)
    }

    /// Unresolved alerts with no email sent yet; low-stock alerts only when
    /// `include_low` is set.
    pub async fn find_awaiting_email(&self, include_low: bool) -> Result<Vec<StockAlert>> {
        let rows: Vec<StockAlertRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM stock_alerts
            WHERE NOT resolved AND NOT email_sent
              AND ($1 OR level IN ('OUT_OF_STOCK', 'CRITICAL'))
            ORDER BY created_at, id
            "#,
            COLUMNS
        ))
        .bind(include_low)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch alerts awaiting email")?;

        rows.into_iter().map(StockAlert::try_from).collect()
    }

    pub async fn mark_email_sent(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE stock_alerts SET email_sent = TRUE, email_sent_at = $2, updated_at = $2 WHERE id = $1 AND NOT email_sent",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("Failed to mark alert email as sent")?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes resolved alerts whose resolution is older than `cutoff`.
    pub async fn delete_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM stock_alerts WHERE resolved AND resolved_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to delete resolved stock alerts")?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_unresolved: i64,
    out_of_stock: i64,
    critical: i64,
    low: i64,
    pending_email: i64,
}

#[derive(Debug, FromRow)]
struct StockAlertRow {
    id: i64,
    level: String,
    entity_type: String,
    entity_id: i64,
    entity_name: String,
    message: String,
    current_stock: i32,
    minimum_stock: i32,
    resolved: bool,
    resolved_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    resolution_comment: Option<String>,
    email_sent: bool,
    email_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockAlertRow> for StockAlert {
    type Error = anyhow::Error;

    fn try_from(row: StockAlertRow) -> Result<Self> {
        let resolution = if row.resolved {
            Some(AlertResolution {
                resolved_by: row
                    .resolved_by
                    .with_context(|| format!("Resolved stock alert {} has no resolver", row.id))?,
                resolved_at: row
                    .resolved_at
                    .with_context(|| format!("Resolved stock alert {} has no timestamp", row.id))?,
                comment: row.resolution_comment,
            })
        } else {
            None
        };
        let email_sent_at = if row.email_sent {
            Some(row.email_sent_at.with_context(|| {
                format!("Stock alert {} is marked emailed without a timestamp", row.id)
            })?)
        } else {
            None
        };

        Ok(Self {
            id: row.id,
            level: row.level.parse()?,
            entity_type: row.entity_type.parse()?,
            entity_id: row.entity_id,
            entity_name: row.entity_name,
            message: row.message,
            current_stock: row.current_stock,
            minimum_stock: row.minimum_stock,
            resolution,
            email_sent_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
