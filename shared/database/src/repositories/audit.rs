//! Audit Repository
//!
//! Immutable audit trail with hash chain verification. Appends are serialized
//! with a table lock so that each entry links to the hash of the entry written
//! just before it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use supplychainx_models::{verify_chain, AuditEntry, ChainVerification};

const COLUMNS: &str = "id, timestamp, action, entity_type, entity_id, user_email, details, hash, previous_hash";

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seals `entry` against the latest stored hash and appends it (no
    /// update/delete).
    pub async fn record(&self, entry: AuditEntry) -> Result<AuditEntry> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("LOCK TABLE audit_entries IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .context("Failed to lock audit trail")?;

        let previous: Option<(String,)> =
            sqlx::query_as("SELECT hash FROM audit_entries ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to read latest audit hash")?;

        let entry = entry.chain(previous.map(|(hash,)| hash));

        let row: AuditRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO audit_entries
                (timestamp, action, entity_type, entity_id, user_email, details, hash, previous_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(entry.timestamp)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.user_email)
        .bind(&entry.details)
        .bind(&entry.hash)
        .bind(&entry.previous_hash)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create audit entry")?;

        tx.commit().await.context("Failed to commit audit entry")?;
        row.try_into()
    }

    /// Newest first.
    pub async fn find(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM audit_entries
            WHERE ($1::VARCHAR IS NULL OR entity_type = $1)
              AND ($2::BIGINT IS NULL OR entity_id = $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
            COLUMNS
        ))
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(filter.limit.unwrap_or(100))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit entries")?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }

    /// Recomputes every hash in insertion order.
    pub async fn verify_chain(&self) -> Result<ChainVerification> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "SELECT {} FROM audit_entries ORDER BY id ASC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch audit entries for verification")?;

        let entries = rows
            .into_iter()
            .map(AuditEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        let verification = verify_chain(&entries);
        if !verification.is_valid {
            tracing::warn!(
                broken_links = ?verification.broken_links,
                "Audit chain verification found broken links"
            );
        }
        Ok(verification)
    }
}

#[derive(Debug, Clone, FromRow)]
struct AuditRow {
    id: i64,
    timestamp: DateTime<Utc>,
    action: String,
    entity_type: String,
    entity_id: Option<i64>,
    user_email: Option<String>,
    details: serde_json::Value,
    hash: String,
    previous_hash: Option<String>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = anyhow::Error;

    fn try_from(row: AuditRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            timestamp: row.timestamp,
            action: row.action.parse()?,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            user_email: row.user_email,
            details: row.details,
            hash: row.hash,
            previous_hash: row.previous_hash,
        })
    }
}
