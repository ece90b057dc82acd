use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;

use supplychainx_models::{Customer, NewCustomer};

const COLUMNS: &str = "id, name, email, phone, address, city, created_at, updated_at";

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Customer>> {
        sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer by ID")
    }

    pub async fn find_all(&self) -> Result<Vec<Customer>> {
        sqlx::query_as(&format!("SELECT {} FROM customers ORDER BY name", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch customers")
    }

    pub async fn create(&self, customer: &NewCustomer) -> Result<Customer> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO customers (name, email, phone, address, city, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create customer")
    }

    pub async fn update(&self, id: i64, customer: &NewCustomer) -> Result<Option<Customer>> {
        sqlx::query_as(&format!(
            r#"
            UPDATE customers SET
                name = $2, email = $3, phone = $4, address = $5, city = $6, updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update customer")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete customer")?;

        Ok(result.rows_affected() > 0)
    }
}
