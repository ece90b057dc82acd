use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use supplychainx_models::{BillOfMaterial, NewBillOfMaterial};
use supplychainx_utils::SupplyChainError;

const COLUMNS: &str = "id, product_id, raw_material_id, quantity_per_unit, unit, created_at";

#[derive(Clone)]
pub struct BillOfMaterialRepository {
    pool: PgPool,
}

impl BillOfMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_product(&self, product_id: i64) -> Result<Vec<BillOfMaterial>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM bill_of_materials WHERE product_id = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch bill of materials")
    }

    pub async fn add(&self, product_id: i64, line: &NewBillOfMaterial) -> Result<BillOfMaterial> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let created = insert_line(&mut tx, product_id, line).await?;
        tx.commit().await.context("Failed to commit BOM line")?;
        Ok(created)
    }

    /// Inserts every line or none of them.
    pub async fn import(&self, product_id: i64, lines: &[NewBillOfMaterial]) -> Result<Vec<BillOfMaterial>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let product: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock product")?;
        if product.is_none() {
            return Err(SupplyChainError::not_found(format!("Product {}", product_id)).into());
        }

        let mut created = Vec::with_capacity(lines.len());
        for line in lines {
            created.push(insert_line(&mut tx, product_id, line).await?);
        }

        tx.commit().await.context("Failed to commit BOM import")?;
        tracing::info!(product_id, lines = created.len(), "Imported bill of materials");
        Ok(created)
    }

    pub async fn delete(&self, product_id: i64, line_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bill_of_materials WHERE id = $1 AND product_id = $2")
            .bind(line_id)
            .bind(product_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete BOM line")?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    line: &NewBillOfMaterial,
) -> Result<BillOfMaterial> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO bill_of_materials (product_id, raw_material_id, quantity_per_unit, unit, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(product_id)
    .bind(line.raw_material_id)
    .bind(line.quantity_per_unit)
    .bind(&line.unit)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
    .with_context(|| format!("Failed to add material {} to product {}", line.raw_material_id, product_id))
}
