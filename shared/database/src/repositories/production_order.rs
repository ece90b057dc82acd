//! Production Order Repository
//!
//! Starting an order is a single transaction: the order row and every material
//! on the product's bill of materials are locked, feasibility is checked on the
//! locked stock, and either every material is decremented and the order moves
//! to `IN_PROGRESS`, or nothing changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use supplychainx_models::{
    check_feasibility, FeasibilityReport, MaterialRequirement, NewProductionOrder, ProductionOrder,
    ProductionOrderStatus,
};
use supplychainx_utils::SupplyChainError;

const COLUMNS: &str =
    "id, product_id, quantity, priority, status, started_at, completed_at, created_at, updated_at";

#[derive(Clone)]
pub struct ProductionOrderRepository {
    pool: PgPool,
}

impl ProductionOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ProductionOrder>> {
        let row: Option<ProductionOrderRow> =
            sqlx::query_as(&format!("SELECT {} FROM production_orders WHERE id = $1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to fetch production order by ID")?;

        row.map(ProductionOrder::try_from).transpose()
    }

    /// Urgent orders first, then oldest first.
    pub async fn find_all(&self, status: Option<ProductionOrderStatus>) -> Result<Vec<ProductionOrder>> {
        let rows: Vec<ProductionOrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM production_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
            ORDER BY (priority = 'URGENT') DESC, created_at, id
            "#,
            COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch production orders")?;

        rows.into_iter().map(ProductionOrder::try_from).collect()
    }

    pub async fn create(&self, order: &NewProductionOrder) -> Result<ProductionOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let product: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
            .bind(order.product_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to look up product")?;
        if product.is_none() {
            return Err(SupplyChainError::not_found(format!("Product {}", order.product_id)).into());
        }

        let row: ProductionOrderRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO production_orders (product_id, quantity, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(order.priority.as_str())
        .bind(ProductionOrderStatus::Planned.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create production order")?;

        tx.commit().await.context("Failed to commit production order")?;
        row.try_into()
    }

    /// Read-only feasibility check against current stock.
    pub async fn feasibility(&self, id: i64) -> Result<FeasibilityReport> {
        let order = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| SupplyChainError::not_found(format!("Production order {}", id)))?;

        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let requirements = load_requirements(&mut conn, order.product_id, false).await?;

        Ok(FeasibilityReport::evaluate(
            order.id,
            order.product_id,
            order.quantity,
            &requirements,
        ))
    }

    /// Checks material availability and consumes it, atomically.
    ///
    /// Fails with `FeasibilityError::InsufficientStock` listing every shortfall;
    /// in that case the order stays `PLANNED` and no stock is touched.
    pub async fn start(&self, id: i64) -> Result<ProductionOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        ensure_transition(&order, ProductionOrderStatus::InProgress)?;

        let requirements = load_requirements(&mut tx, order.product_id, true).await?;
        let plan = check_feasibility(order.quantity, &requirements)?;

        let now = Utc::now();
        for consumption in &plan {
            let quantity = i32::try_from(consumption.quantity)
                .context("Material consumption exceeds the stock column range")?;
            sqlx::query("UPDATE raw_materials SET stock = stock - $2, updated_at = $3 WHERE id = $1")
                .bind(consumption.material_id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to consume material {}", consumption.material_id))?;
        }

        let started = set_status(&mut tx, id, ProductionOrderStatus::InProgress, now).await?;
        tx.commit().await.context("Failed to commit production start")?;

        tracing::info!(
            production_order_id = id,
            product_id = started.product_id,
            quantity = started.quantity,
            materials = plan.len(),
            "Production order started"
        );
        Ok(started)
    }

    /// Marks the order completed and adds the produced quantity to product stock.
    pub async fn complete(&self, id: i64) -> Result<ProductionOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        ensure_transition(&order, ProductionOrderStatus::Completed)?;

        let now = Utc::now();
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = $3 WHERE id = $1")
            .bind(order.product_id)
            .bind(order.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("Failed to credit product stock")?;

        let completed = set_status(&mut tx, id, ProductionOrderStatus::Completed, now).await?;
        tx.commit().await.context("Failed to commit production completion")?;
        Ok(completed)
    }

    pub async fn cancel(&self, id: i64) -> Result<ProductionOrder> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        ensure_transition(&order, ProductionOrderStatus::Cancelled)?;

        let cancelled = set_status(&mut tx, id, ProductionOrderStatus::Cancelled, Utc::now()).await?;
        tx.commit().await.context("Failed to commit production cancellation")?;
        Ok(cancelled)
    }

    /// Only planned orders can be deleted.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let order = lock_order(&mut tx, id).await?;
        if order.status != ProductionOrderStatus::Planned {
            return Err(SupplyChainError::business_rule(format!(
                "Production order {} is {} and can no longer be deleted",
                id, order.status
            ))
            .into());
        }

        sqlx::query("DELETE FROM production_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete production order")?;

        tx.commit().await.context("Failed to commit production order deletion")?;
        Ok(())
    }
}

fn ensure_transition(order: &ProductionOrder, target: ProductionOrderStatus) -> Result<()> {
    if order.status.can_transition_to(target) {
        Ok(())
    } else {
        Err(SupplyChainError::business_rule(format!(
            "Production order {} cannot move from {} to {}",
            order.id, order.status, target
        ))
        .into())
    }
}

async fn lock_order(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<ProductionOrder> {
    let row: Option<ProductionOrderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM production_orders WHERE id = $1 FOR UPDATE",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to lock production order")?;

    match row {
        Some(row) => row.try_into(),
        None => Err(SupplyChainError::not_found(format!("Production order {}", id)).into()),
    }
}

async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    status: ProductionOrderStatus,
    now: DateTime<Utc>,
) -> Result<ProductionOrder> {
    let row: ProductionOrderRow = sqlx::query_as(&format!(
        r#"
        UPDATE production_orders SET
            status = $2,
            started_at = CASE WHEN $2 = 'IN_PROGRESS' THEN $3 ELSE started_at END,
            completed_at = CASE WHEN $2 = 'COMPLETED' THEN $3 ELSE completed_at END,
            updated_at = $3
        WHERE id = $1
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .context("Failed to update production order status")?;

    row.try_into()
}

/// BOM lines of a product joined with their material's stock. With `lock`,
/// the material rows stay locked until the surrounding transaction ends.
async fn load_requirements(
    conn: &mut sqlx::PgConnection,
    product_id: i64,
    lock: bool,
) -> Result<Vec<MaterialRequirement>> {
    let rows: Vec<RequirementRow> = sqlx::query_as(&format!(
        r#"
        SELECT m.id AS material_id, m.name AS material_name,
               b.quantity_per_unit AS required_per_unit, m.stock AS available_stock
        FROM bill_of_materials b
        JOIN raw_materials m ON m.id = b.raw_material_id
        WHERE b.product_id = $1
        ORDER BY m.id, b.id
        {}
        "#,
        if lock { "FOR UPDATE OF m" } else { "" }
    ))
    .bind(product_id)
    .fetch_all(conn)
    .await
    .context("Failed to load material requirements")?;

    Ok(rows
        .into_iter()
        .map(|r| MaterialRequirement {
            material_id: r.material_id,
            material_name: r.material_name,
            required_per_unit: r.required_per_unit,
            available_stock: r.available_stock,
        })
        .collect())
}

#[derive(Debug, FromRow)]
struct RequirementRow {
    material_id: i64,
    material_name: String,
    required_per_unit: i32,
    available_stock: i32,
}

#[derive(Debug, FromRow)]
struct ProductionOrderRow {
    id: i64,
    product_id: i64,
    quantity: i32,
    priority: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductionOrderRow> for ProductionOrder {
    type Error = anyhow::Error;

    fn try_from(row: ProductionOrderRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            priority: row.priority.parse()?,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
