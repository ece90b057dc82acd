use anyhow::{Context, Result};
use sqlx::{FromRow, PgPool};

use supplychainx_models::{StockSnapshot, StockedEntityType};

/// Read-only view over everything that carries a stock level.
#[derive(Clone)]
pub struct StockLevelRepository {
    pool: PgPool,
}

impl StockLevelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current stock and minimum of every raw material and product.
    pub async fn snapshot_all(&self) -> Result<Vec<StockSnapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT 'RAW_MATERIAL' AS entity_type, id AS entity_id, name AS entity_name,
                   stock AS current_stock, min_stock AS minimum_stock
            FROM raw_materials
            UNION ALL
            SELECT 'PRODUCT', id, name, stock, min_stock
            FROM products
            ORDER BY entity_type, entity_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to snapshot stock levels")?;

        rows.into_iter()
            .map(|row| {
                Ok(StockSnapshot {
                    entity_type: row.entity_type.parse::<StockedEntityType>()?,
                    entity_id: row.entity_id,
                    entity_name: row.entity_name,
                    current_stock: row.current_stock,
                    minimum_stock: row.minimum_stock,
                })
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    entity_type: String,
    entity_id: i64,
    entity_name: String,
    current_stock: i32,
    minimum_stock: i32,
}
