use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use supplychainx_models::{Delivery, DeliveryStatus, NewDelivery, OrderStatus};
use supplychainx_utils::SupplyChainError;

use super::customer_order;

const COLUMNS: &str =
    "id, order_id, vehicle, driver, planned_date, delivered_at, cost, status, created_at, updated_at";

#[derive(Clone)]
pub struct DeliveryRepository {
    pool: PgPool,
}

impl DeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Delivery>> {
        let row: Option<DeliveryRow> =
            sqlx::query_as(&format!("SELECT {} FROM deliveries WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch delivery by ID")?;

        row.map(Delivery::try_from).transpose()
    }

    pub async fn find_all(&self, status: Option<DeliveryStatus>) -> Result<Vec<Delivery>> {
        let rows: Vec<DeliveryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM deliveries
            WHERE ($1::VARCHAR IS NULL OR status = $1)
            ORDER BY planned_date, id
            "#,
            COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch deliveries")?;

        rows.into_iter().map(Delivery::try_from).collect()
    }

    /// Plans a delivery for an order that is still being prepared.
    pub async fn create(&self, delivery: &NewDelivery) -> Result<Delivery> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = customer_order::lock_order(&mut tx, delivery.order_id).await?;
        if order.status != OrderStatus::Preparing {
            return Err(SupplyChainError::business_rule(format!(
                "Customer order {} is {}; deliveries can only be planned for PREPARING orders",
                order.id, order.status
            ))
            .into());
        }

        let row: DeliveryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO deliveries
                (order_id, vehicle, driver, planned_date, cost, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(delivery.order_id)
        .bind(&delivery.vehicle)
        .bind(&delivery.driver)
        .bind(delivery.planned_date)
        .bind(delivery.cost)
        .bind(DeliveryStatus::Planned.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create delivery")?;

        tx.commit().await.context("Failed to commit delivery")?;
        row.try_into()
    }

    /// Advances the delivery and moves its order to the matching status in the
    /// same transaction.
    pub async fn update_status(&self, id: i64, target: DeliveryStatus) -> Result<Delivery> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row: Option<DeliveryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM deliveries WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock delivery")?;
        let current: Delivery = match row {
            Some(row) => row.try_into()?,
            None => return Err(SupplyChainError::not_found(format!("Delivery {}", id)).into()),
        };

        if !current.status.can_transition_to(target) {
            return Err(SupplyChainError::business_rule(format!(
                "Delivery {} cannot move from {} to {}",
                id, current.status, target
            ))
            .into());
        }

        let now = Utc::now();
        if let Some(order_status) = target.order_status() {
            let order = customer_order::lock_order(&mut tx, current.order_id).await?;
            if !order.status.can_transition_to(order_status) {
                return Err(SupplyChainError::business_rule(format!(
                    "Customer order {} cannot move from {} to {}",
                    order.id, order.status, order_status
                ))
                .into());
            }
            customer_order::set_status(&mut tx, order.id, order_status, now).await?;
        }

        let row: DeliveryRow = sqlx::query_as(&format!(
            r#"
            UPDATE deliveries SET
                status = $2,
                delivered_at = CASE WHEN $2 = 'DELIVERED' THEN $3 ELSE delivered_at END,
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(target.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update delivery status")?;

        tx.commit().await.context("Failed to commit delivery status")?;
        row.try_into()
    }

    /// Only planned deliveries can be deleted.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| SupplyChainError::not_found(format!("Delivery {}", id)))?;
        if current.status != DeliveryStatus::Planned {
            return Err(SupplyChainError::business_rule(format!(
                "Delivery {} is {} and can no longer be deleted",
                id, current.status
            ))
            .into());
        }

        let result = sqlx::query("DELETE FROM deliveries WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(DeliveryStatus::Planned.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to delete delivery")?;

        // lost a race with a status change
        if result.rows_affected() == 0 {
            return Err(SupplyChainError::conflict(format!("Delivery {} changed while deleting", id)).into());
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: i64,
    order_id: i64,
    vehicle: Option<String>,
    driver: Option<String>,
    planned_date: NaiveDate,
    delivered_at: Option<DateTime<Utc>>,
    cost: Option<f64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = anyhow::Error;

    fn try_from(row: DeliveryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            vehicle: row.vehicle,
            driver: row.driver,
            planned_date: row.planned_date,
            delivered_at: row.delivered_at,
            cost: row.cost,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
