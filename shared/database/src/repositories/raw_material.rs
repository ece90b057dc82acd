use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use supplychainx_models::{NewRawMaterial, RawMaterial};

const COLUMNS: &str = "id, name, description, unit, stock, min_stock, supplier_id, created_at, updated_at";

#[derive(Clone)]
pub struct RawMaterialRepository {
    pool: PgPool,
}

impl RawMaterialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<RawMaterial>> {
        sqlx::query_as(&format!("SELECT {} FROM raw_materials WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch raw material by ID")
    }

    pub async fn find_all(&self) -> Result<Vec<RawMaterial>> {
        sqlx::query_as(&format!("SELECT {} FROM raw_materials ORDER BY name", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch raw materials")
    }

    /// Materials whose stock is strictly below their minimum, emptiest first.
    pub async fn find_below_minimum(&self) -> Result<Vec<RawMaterial>> {
        sqlx::query_as(&format!(
            "SELECT {} FROM raw_materials WHERE stock < min_stock ORDER BY stock, name",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch raw materials below minimum")
    }

    pub async fn create(&self, material: &NewRawMaterial) -> Result<RawMaterial> {
        let now = Utc::now();

        sqlx::query_as(&format!(
            r#"
            INSERT INTO raw_materials
                (name, description, unit, stock, min_stock, supplier_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&material.name)
        .bind(&material.description)
        .bind(&material.unit)
        .bind(material.stock)
        .bind(material.min_stock)
        .bind(material.supplier_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create raw material")
    }

    pub async fn update(&self, id: i64, material: &NewRawMaterial) -> Result<Option<RawMaterial>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE raw_materials SET
                name = $2,
                description = $3,
                unit = $4,
                stock = $5,
                min_stock = $6,
                supplier_id = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&material.name)
        .bind(&material.description)
        .bind(&material.unit)
        .bind(material.stock)
        .bind(material.min_stock)
        .bind(material.supplier_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update raw material")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM raw_materials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete raw material")?;

        Ok(result.rows_affected() > 0)
    }
}
