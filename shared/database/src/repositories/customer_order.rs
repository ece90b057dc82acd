//! Customer Order Repository
//!
//! Placing an order reserves finished-product stock; cancelling a preparing
//! order gives it back.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use supplychainx_models::{CustomerOrder, NewCustomerOrder, OrderStatus};
use supplychainx_utils::SupplyChainError;

const COLUMNS: &str = "id, customer_id, product_id, quantity, status, order_date, created_at, updated_at";

#[derive(Clone)]
pub struct CustomerOrderRepository {
    pool: PgPool,
}

impl CustomerOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CustomerOrder>> {
        let row: Option<CustomerOrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM customer_orders WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch customer order by ID")?;

        row.map(CustomerOrder::try_from).transpose()
    }

    pub async fn find_all(
        &self,
        customer_id: Option<i64>,
        status: Option<OrderStatus>,
    ) -> Result<Vec<CustomerOrder>> {
        let rows: Vec<CustomerOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM customer_orders
            WHERE ($1::BIGINT IS NULL OR customer_id = $1)
              AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY order_date DESC, id DESC
            "#,
            COLUMNS
        ))
        .bind(customer_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch customer orders")?;

        rows.into_iter().map(CustomerOrder::try_from).collect()
    }

    /// Creates the order and reserves `quantity` units of the product.
    pub async fn create(&self, order: &NewCustomerOrder) -> Result<CustomerOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let product: Option<(String, i32)> =
            sqlx::query_as("SELECT name, stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(order.product_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to lock product")?;
        let (product_name, stock) = product
            .ok_or_else(|| SupplyChainError::not_found(format!("Product {}", order.product_id)))?;

        if stock < order.quantity {
            return Err(SupplyChainError::business_rule_with_details(
                format!(
                    "Insufficient stock for product '{}': requested {}, available {}",
                    product_name, order.quantity, stock
                ),
                serde_json::json!({
                    "product_id": order.product_id,
                    "requested": order.quantity,
                    "available": stock,
                }),
            )
            .into());
        }

        let now = Utc::now();
        sqlx::query("UPDATE products SET stock = stock - $2, updated_at = $3 WHERE id = $1")
            .bind(order.product_id)
            .bind(order.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to reserve product stock")?;

        let row: CustomerOrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO customer_orders
                (customer_id, product_id, quantity, status, order_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order.customer_id)
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(OrderStatus::Preparing.as_str())
        .bind(now.date_naive())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create customer order")?;

        tx.commit().await.context("Failed to commit customer order")?;
        row.try_into()
    }

    /// Cancels a preparing order and returns its quantity to product stock.
    pub async fn cancel(&self, id: i64) -> Result<CustomerOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(SupplyChainError::business_rule(format!(
                "Customer order {} is {} and can no longer be cancelled",
                id, order.status
            ))
            .into());
        }

        let now = Utc::now();
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = $3 WHERE id = $1")
            .bind(order.product_id)
            .bind(order.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to release product stock")?;

        let cancelled = set_status(&mut tx, id, OrderStatus::Cancelled, now).await?;
        tx.commit().await.context("Failed to commit order cancellation")?;
        Ok(cancelled)
    }

    /// Removes a cancelled or delivered order; live orders must be cancelled first.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        if !matches!(order.status, OrderStatus::Cancelled | OrderStatus::Delivered) {
            return Err(SupplyChainError::business_rule(format!(
                "Customer order {} is {}; cancel it before deleting",
                id, order.status
            ))
            .into());
        }

        sqlx::query("DELETE FROM deliveries WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete order deliveries")?;
        sqlx::query("DELETE FROM customer_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete customer order")?;

        tx.commit().await.context("Failed to commit order deletion")?;
        Ok(())
    }
}

pub(crate) async fn lock_order(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<CustomerOrder> {
    let row: Option<CustomerOrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM customer_orders WHERE id = $1 FOR UPDATE",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to lock customer order")?;

    match row {
        Some(row) => row.try_into(),
        None => Err(SupplyChainError::not_found(format!("Customer order {}", id)).into()),
    }
}

pub(crate) async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> Result<CustomerOrder> {
    let row: CustomerOrderRow = sqlx::query_as(&format!(
        "UPDATE customer_orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
        COLUMNS
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .context("Failed to update customer order status")?;

    row.try_into()
}

#[derive(Debug, FromRow)]
struct CustomerOrderRow {
    id: i64,
    customer_id: i64,
    product_id: i64,
    quantity: i32,
    status: String,
    order_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerOrderRow> for CustomerOrder {
    type Error = anyhow::Error;

    fn try_from(row: CustomerOrderRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            product_id: row.product_id,
            quantity: row.quantity,
            status: row.status.parse()?,
            order_date: row.order_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
