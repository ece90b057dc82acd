//! Supplier Repository
//!
//! CRUD operations for supplier records.
//! Uses runtime SQL queries (unchecked) to avoid requiring DATABASE_URL at compile time.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use supplychainx_models::{NewSupplier, Supplier};

const COLUMNS: &str = "id, name, contact_person, email, phone, address, rating, lead_time_days, created_at, updated_at";

#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Supplier>> {
        sqlx::query_as(&format!("SELECT {} FROM suppliers WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch supplier by ID")
    }

    pub async fn find_all(&self) -> Result<Vec<Supplier>> {
        sqlx::query_as(&format!("SELECT {} FROM suppliers ORDER BY name", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch all suppliers")
    }

    /// Case-insensitive substring search on the supplier name.
    pub async fn search_by_name(&self, query: &str) -> Result<Vec<Supplier>> {
        let search_pattern = format!("%{}%", query.to_lowercase());

        sqlx::query_as(&format!(
            "SELECT {} FROM suppliers WHERE LOWER(name) LIKE $1 ORDER BY name LIMIT 100",
            COLUMNS
        ))
        .bind(&search_pattern)
        .fetch_all(&self.pool)
        .await
        .context("Failed to search suppliers by name")
    }

    pub async fn create(&self, supplier: &NewSupplier) -> Result<Supplier> {
        let now = Utc::now();

        sqlx::query_as(&format!(
            r#"
            INSERT INTO suppliers
                (name, contact_person, email, phone, address, rating, lead_time_days, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.rating)
        .bind(supplier.lead_time_days)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create supplier")
    }

    pub async fn update(&self, id: i64, supplier: &NewSupplier) -> Result<Option<Supplier>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE suppliers SET
                name = $2,
                contact_person = $3,
                email = $4,
                phone = $5,
                address = $6,
                rating = $7,
                lead_time_days = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.rating)
        .bind(supplier.lead_time_days)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update supplier")
    }

    /// Suppliers referenced by supply orders cannot be deleted (foreign key).
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete supplier")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM suppliers")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count suppliers")?;

        Ok(row.0)
    }
}
