use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use supplychainx_models::{NewProduct, Product};

const COLUMNS: &str =
    "id, name, description, production_time_hours, unit_cost, stock, min_stock, created_at, updated_at";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Product>> {
        sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product by ID")
    }

    pub async fn find_all(&self) -> Result<Vec<Product>> {
        sqlx::query_as(&format!("SELECT {} FROM products ORDER BY name", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch products")
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Product> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO products
                (name, description, production_time_hours, unit_cost, stock, min_stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.production_time_hours)
        .bind(product.unit_cost)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create product")
    }

    pub async fn update(&self, id: i64, product: &NewProduct) -> Result<Option<Product>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE products SET
                name = $2,
                description = $3,
                production_time_hours = $4,
                unit_cost = $5,
                stock = $6,
                min_stock = $7,
                updated_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.production_time_hours)
        .bind(product.unit_cost)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update product")
    }

    /// Removes the product and its BOM lines; fails while orders reference it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete product")?;

        Ok(result.rows_affected() > 0)
    }
}
