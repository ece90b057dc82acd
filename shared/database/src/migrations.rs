use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};

/// Schema statements, applied in order. Every statement is idempotent so the
/// whole list runs at each startup.
const SCHEMA: &[(&str, &str)] = &[
    (
        "suppliers",
        r#"
        CREATE TABLE IF NOT EXISTS suppliers (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            contact_person VARCHAR(255),
            email VARCHAR(255),
            phone VARCHAR(30),
            address VARCHAR(500),
            rating DOUBLE PRECISION CHECK (rating >= 0 AND rating <= 5),
            lead_time_days INTEGER CHECK (lead_time_days >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "raw_materials",
        r#"
        CREATE TABLE IF NOT EXISTS raw_materials (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            unit VARCHAR(20) NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            min_stock INTEGER NOT NULL DEFAULT 0 CHECK (min_stock >= 0),
            supplier_id BIGINT REFERENCES suppliers(id) ON DELETE SET NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "supply_orders",
        r#"
        CREATE TABLE IF NOT EXISTS supply_orders (
            id BIGSERIAL PRIMARY KEY,
            supplier_id BIGINT NOT NULL REFERENCES suppliers(id),
            status VARCHAR(20) NOT NULL,
            order_date DATE NOT NULL,
            expected_date DATE,
            received_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "supply_order_lines",
        r#"
        CREATE TABLE IF NOT EXISTS supply_order_lines (
            id BIGSERIAL PRIMARY KEY,
            supply_order_id BIGINT NOT NULL REFERENCES supply_orders(id) ON DELETE CASCADE,
            raw_material_id BIGINT NOT NULL REFERENCES raw_materials(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            unit_price DOUBLE PRECISION CHECK (unit_price >= 0)
        )
        "#,
    ),
    (
        "products",
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            production_time_hours DOUBLE PRECISION CHECK (production_time_hours >= 0),
            unit_cost DOUBLE PRECISION CHECK (unit_cost >= 0),
            stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            min_stock INTEGER NOT NULL DEFAULT 0 CHECK (min_stock >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "bill_of_materials",
        r#"
        CREATE TABLE IF NOT EXISTS bill_of_materials (
            id BIGSERIAL PRIMARY KEY,
            product_id BIGINT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            raw_material_id BIGINT NOT NULL REFERENCES raw_materials(id),
            quantity_per_unit INTEGER NOT NULL CHECK (quantity_per_unit > 0),
            unit VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "production_orders",
        r#"
        CREATE TABLE IF NOT EXISTS production_orders (
            id BIGSERIAL PRIMARY KEY,
            product_id BIGINT NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            priority VARCHAR(20) NOT NULL,
            status VARCHAR(20) NOT NULL,
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "customers",
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255),
            phone VARCHAR(30),
            address VARCHAR(500),
            city VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "customer_orders",
        r#"
        CREATE TABLE IF NOT EXISTS customer_orders (
            id BIGSERIAL PRIMARY KEY,
            customer_id BIGINT NOT NULL REFERENCES customers(id),
            product_id BIGINT NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            status VARCHAR(20) NOT NULL,
            order_date DATE NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "deliveries",
        r#"
        CREATE TABLE IF NOT EXISTS deliveries (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT NOT NULL UNIQUE REFERENCES customer_orders(id),
            vehicle VARCHAR(100),
            driver VARCHAR(255),
            planned_date DATE NOT NULL,
            delivered_at TIMESTAMPTZ,
            cost DOUBLE PRECISION CHECK (cost >= 0),
            status VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            first_name VARCHAR(100) NOT NULL,
            last_name VARCHAR(100) NOT NULL,
            email VARCHAR(255) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            role VARCHAR(40) NOT NULL,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            failed_login_attempts INTEGER NOT NULL DEFAULT 0 CHECK (failed_login_attempts >= 0),
            locked_until TIMESTAMPTZ,
            last_login_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "stock_alerts",
        r#"
        CREATE TABLE IF NOT EXISTS stock_alerts (
            id BIGSERIAL PRIMARY KEY,
            level VARCHAR(20) NOT NULL,
            entity_type VARCHAR(20) NOT NULL,
            entity_id BIGINT NOT NULL,
            entity_name VARCHAR(255) NOT NULL,
            message TEXT NOT NULL,
            current_stock INTEGER NOT NULL,
            minimum_stock INTEGER NOT NULL,
            resolved BOOLEAN NOT NULL DEFAULT FALSE,
            resolved_by VARCHAR(255),
            resolved_at TIMESTAMPTZ,
            resolution_comment TEXT,
            email_sent BOOLEAN NOT NULL DEFAULT FALSE,
            email_sent_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT stock_alert_resolution_complete CHECK (
                (resolved AND resolved_by IS NOT NULL AND resolved_at IS NOT NULL)
                OR (NOT resolved AND resolved_by IS NULL AND resolved_at IS NULL)
            ),
            CONSTRAINT stock_alert_email_timestamp CHECK (NOT email_sent OR email_sent_at IS NOT NULL)
        )
        "#,
    ),
    (
        "audit_entries",
        r#"
        CREATE TABLE IF NOT EXISTS audit_entries (
            id BIGSERIAL PRIMARY KEY,
            timestamp TIMESTAMPTZ NOT NULL,
            action VARCHAR(30) NOT NULL,
            entity_type VARCHAR(50) NOT NULL,
            entity_id BIGINT,
            user_email VARCHAR(255),
            details JSONB NOT NULL DEFAULT '{}',
            hash VARCHAR(64) NOT NULL,
            previous_hash VARCHAR(64)
        )
        "#,
    ),
    (
        "indexes",
        r#"
        CREATE INDEX IF NOT EXISTS idx_raw_materials_supplier ON raw_materials(supplier_id);
        CREATE INDEX IF NOT EXISTS idx_supply_order_lines_order ON supply_order_lines(supply_order_id);
        CREATE INDEX IF NOT EXISTS idx_bom_product ON bill_of_materials(product_id);
        CREATE INDEX IF NOT EXISTS idx_production_orders_status ON production_orders(status);
        CREATE INDEX IF NOT EXISTS idx_customer_orders_customer ON customer_orders(customer_id);
        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_entries(entity_type, entity_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_stock_alerts_open_entity
            ON stock_alerts(entity_type, entity_id) WHERE NOT resolved;
        "#,
    ),
];

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    for (name, statement) in SCHEMA {
        // plain &str runs unprepared, which allows several statements per step
        pool.execute(*statement)
            .await
            .with_context(|| format!("Failed to apply migration '{}'", name))?;
    }

    tracing::info!(steps = SCHEMA.len(), "PostgreSQL migrations completed");
    Ok(())
}
