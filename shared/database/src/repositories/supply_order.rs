//! Supply Order Repository
//!
//! Orders and their lines are written together. Receiving an order adds every
//! line's quantity to the material stock in the same transaction.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use supplychainx_models::{NewSupplyOrder, SupplyOrder, SupplyOrderLine, SupplyOrderStatus};
use supplychainx_utils::SupplyChainError;

const ORDER_COLUMNS: &str = "id, supplier_id, status, order_date, expected_date, received_at, created_at, updated_at";

#[derive(Clone)]
pub struct SupplyOrderRepository {
    pool: PgPool,
}

impl SupplyOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<SupplyOrder>> {
        let row: Option<SupplyOrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM supply_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch supply order by ID")?;

        match row {
            Some(row) => {
                let lines = self.find_lines(&[row.id]).await?;
                Ok(Some(row.into_order(lines.into_iter().map(|(_, l)| l).collect())?))
            }
            None => Ok(None),
        }
    }

    pub async fn find_all(&self, status: Option<SupplyOrderStatus>) -> Result<Vec<SupplyOrder>> {
        let rows: Vec<SupplyOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM supply_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
            ORDER BY order_date DESC, id DESC
            "#,
            ORDER_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch supply orders")?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut lines_by_order: HashMap<i64, Vec<SupplyOrderLine>> = HashMap::new();
        for (order_id, line) in self.find_lines(&ids).await? {
            lines_by_order.entry(order_id).or_default().push(line);
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    async fn find_lines(&self, order_ids: &[i64]) -> Result<Vec<(i64, SupplyOrderLine)>> {
        let rows: Vec<SupplyOrderLineRow> = sqlx::query_as(
            r#"
            SELECT id, supply_order_id, raw_material_id, quantity, unit_price
            FROM supply_order_lines
            WHERE supply_order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch supply order lines")?;

        Ok(rows.into_iter().map(SupplyOrderLineRow::into_line).collect())
    }

    /// Inserts the order in `Pending` status with all of its lines.
    pub async fn create(&self, order: &NewSupplyOrder) -> Result<SupplyOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let now = Utc::now();

        let row: SupplyOrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO supply_orders
                (supplier_id, status, order_date, expected_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.supplier_id)
        .bind(SupplyOrderStatus::Pending.as_str())
        .bind(order.order_date.unwrap_or_else(|| now.date_naive()))
        .bind(order.expected_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create supply order")?;

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let line_row: SupplyOrderLineRow = sqlx::query_as(
                r#"
                INSERT INTO supply_order_lines (supply_order_id, raw_material_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, supply_order_id, raw_material_id, quantity, unit_price
                "#,
            )
            .bind(row.id)
            .bind(line.raw_material_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to create supply order line")?;
            lines.push(line_row.into_line());
        }

        tx.commit().await.context("Failed to commit supply order")?;
        row.into_order(lines.into_iter().map(|(_, l)| l).collect())
    }

    /// Moves the order to `target`. Receiving credits every line's quantity to
    /// its material and stamps the received date.
    pub async fn update_status(&self, id: i64, target: SupplyOrderStatus) -> Result<SupplyOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let current = lock_order(&mut tx, id).await?;
        let status: SupplyOrderStatus = current.status.parse()?;
        if !status.can_transition_to(target) {
            return Err(SupplyChainError::business_rule(format!(
                "Supply order {} cannot move from {} to {}",
                id, status, target
            ))
            .into());
        }

        let now = Utc::now();
        if target == SupplyOrderStatus::Received {
            let received = sqlx::query(
                r#"
                UPDATE raw_materials m
                SET stock = m.stock + l.total, updated_at = $2
                FROM (
                    SELECT raw_material_id, SUM(quantity)::INTEGER AS total
                    FROM supply_order_lines
                    WHERE supply_order_id = $1
                    GROUP BY raw_material_id
                ) l
                WHERE m.id = l.raw_material_id
                "#,
            )
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to credit received stock")?;

            tracing::info!(
                supply_order_id = id,
                materials = received.rows_affected(),
                "Supply order received, stock credited"
            );
        }

        let row: SupplyOrderRow = sqlx::query_as(&format!(
            r#"
            UPDATE supply_orders SET
                status = $2,
                received_at = CASE WHEN $2 = 'RECEIVED' THEN $3 ELSE received_at END,
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(target.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update supply order status")?;

        tx.commit().await.context("Failed to commit supply order status")?;

        let lines = self.find_lines(&[id]).await?;
        row.into_order(lines.into_iter().map(|(_, l)| l).collect())
    }

    /// Only pending orders can be deleted.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let current = lock_order(&mut tx, id).await?;
        if current.status != SupplyOrderStatus::Pending.as_str() {
            return Err(SupplyChainError::business_rule(format!(
                "Supply order {} is {} and can no longer be deleted",
                id, current.status
            ))
            .into());
        }

        sqlx::query("DELETE FROM supply_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete supply order")?;

        tx.commit().await.context("Failed to commit supply order deletion")?;
        Ok(())
    }
}

async fn lock_order(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<SupplyOrderRow> {
    let row: Option<SupplyOrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM supply_orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to lock supply order")?;

    row.ok_or_else(|| SupplyChainError::not_found(format!("Supply order {}", id)).into())
}

#[derive(Debug, FromRow)]
struct SupplyOrderRow {
    id: i64,
    supplier_id: i64,
    status: String,
    order_date: NaiveDate,
    expected_date: Option<NaiveDate>,
    received_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SupplyOrderRow {
    fn into_order(self, lines: Vec<SupplyOrderLine>) -> Result<SupplyOrder> {
        Ok(SupplyOrder {
            id: self.id,
            supplier_id: self.supplier_id,
            status: self.status.parse()?,
            order_date: self.order_date,
            expected_date: self.expected_date,
            received_at: self.received_at,
            lines,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplyOrderLineRow {
    id: i64,
    supply_order_id: i64,
    raw_material_id: i64,
    quantity: i32,
    unit_price: Option<f64>,
}

impl SupplyOrderLineRow {
    fn into_line(self) -> (i64, SupplyOrderLine) {
        (
            self.supply_order_id,
            SupplyOrderLine {
                id: self.id,
                raw_material_id: self.raw_material_id,
                quantity: self.quantity,
                unit_price: self.unit_price,
            },
        )
    }
}
