//! PostgreSQL integration tests.
//!
//! Run against a scratch database:
//! `DATABASE_URL=postgres://... cargo test -p supplychainx-database -- --ignored`

use chrono::Utc;
use supplychainx_database::{
    initialize_database, AuditRepository, BillOfMaterialRepository, CustomerOrderRepository,
    CustomerRepository, DatabaseConfig, PostgresPool, ProductRepository, ProductionOrderRepository,
    RawMaterialRepository, StockAlertRepository, StockLevelRepository, UserRepository,
};
use supplychainx_models::{
    AuditAction, AuditEntry, FeasibilityError, NewBillOfMaterial, NewCustomer, NewCustomerOrder,
    LockoutPolicy, NewProduct, NewProductionOrder, NewRawMaterial, ProductionOrderStatus,
    ProductionPriority, Role, StockAlert, StockedEntityType,
};
use supplychainx_utils::SupplyChainError;

async fn pool() -> PostgresPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let config = DatabaseConfig {
        postgres_url: url,
        ..Default::default()
    };
    initialize_database(&config).await.expect("database should initialize")
}

fn unique(name: &str) -> String {
    format!("{}-{}", name, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn material(pool: &PostgresPool, stock: i32, min_stock: i32) -> i64 {
    RawMaterialRepository::new(pool.clone())
        .create(&NewRawMaterial {
            name: unique("oak-plank"),
            description: None,
            unit: "pcs".to_string(),
            stock,
            min_stock,
            supplier_id: None,
        })
        .await
        .unwrap()
        .id
}

async fn product(pool: &PostgresPool, stock: i32) -> i64 {
    ProductRepository::new(pool.clone())
        .create(&NewProduct {
            name: unique("chair"),
            description: None,
            production_time_hours: Some(1.5),
            unit_cost: Some(40.0),
            stock,
            min_stock: 0,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_start_fails_on_shortage_then_succeeds_after_restock() {
    let pool = pool().await;
    let materials = RawMaterialRepository::new(pool.clone());
    let orders = ProductionOrderRepository::new(pool.clone());

    let material_id = material(&pool, 15, 0).await;
    let product_id = product(&pool, 0).await;
    BillOfMaterialRepository::new(pool.clone())
        .add(
            product_id,
            &NewBillOfMaterial {
                raw_material_id: material_id,
                quantity_per_unit: 2,
                unit: "pcs".to_string(),
            },
        )
        .await
        .unwrap();

    let order = orders
        .create(&NewProductionOrder {
            product_id,
            quantity: 10,
            priority: ProductionPriority::Standard,
        })
        .await
        .unwrap();

    let err = orders.start(order.id).await.unwrap_err();
    match err.downcast_ref::<FeasibilityError>() {
        Some(FeasibilityError::InsufficientStock(shortfalls)) => {
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].required, 20);
            assert_eq!(shortfalls[0].available, 15);
        }
        other => panic!("expected a shortfall, got {:?}", other),
    }
    let unchanged = orders.find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, ProductionOrderStatus::Planned);
    assert_eq!(materials.find_by_id(material_id).await.unwrap().unwrap().stock, 15);

    sqlx::query("UPDATE raw_materials SET stock = 25 WHERE id = $1")
        .bind(material_id)
        .execute(&pool)
        .await
        .unwrap();

    let started = orders.start(order.id).await.unwrap();
    assert_eq!(started.status, ProductionOrderStatus::InProgress);
    assert!(started.started_at.is_some());
    assert_eq!(materials.find_by_id(material_id).await.unwrap().unwrap().stock, 5);

    let completed = orders.complete(order.id).await.unwrap();
    assert_eq!(completed.status, ProductionOrderStatus::Completed);
    let products = ProductRepository::new(pool.clone());
    assert_eq!(products.find_by_id(product_id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_customer_order_reserves_and_releases_stock() {
    let pool = pool().await;
    let product_id = product(&pool, 8).await;
    let customer = CustomerRepository::new(pool.clone())
        .create(&NewCustomer {
            name: unique("atelier"),
            email: None,
            phone: None,
            address: None,
            city: Some("Lille".to_string()),
        })
        .await
        .unwrap();
    let orders = CustomerOrderRepository::new(pool.clone());
    let products = ProductRepository::new(pool.clone());

    let too_many = orders
        .create(&NewCustomerOrder {
            customer_id: customer.id,
            product_id,
            quantity: 9,
        })
        .await
        .unwrap_err();
    assert_eq!(SupplyChainError::from(too_many).http_status_code(), 422);

    let order = orders
        .create(&NewCustomerOrder {
            customer_id: customer.id,
            product_id,
            quantity: 5,
        })
        .await
        .unwrap();
    assert_eq!(products.find_by_id(product_id).await.unwrap().unwrap().stock, 3);

    orders.cancel(order.id).await.unwrap();
    assert_eq!(products.find_by_id(product_id).await.unwrap().unwrap().stock, 8);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_one_open_alert_per_entity() {
    let pool = pool().await;
    let material_id = material(&pool, 2, 10).await;
    let alerts = StockAlertRepository::new(pool.clone());

    let snapshot = StockLevelRepository::new(pool.clone())
        .snapshot_all()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.entity_type == StockedEntityType::RawMaterial && s.entity_id == material_id)
        .unwrap();
    let alert = StockAlert::raise(&snapshot);

    let first = alerts.insert(&alert).await.unwrap().unwrap();
    assert!(first.is_critical());
    assert!(alerts.insert(&alert).await.unwrap().is_none());

    let resolved = alerts.resolve(first.id, "planner@supplychainx.io", None, Utc::now()).await.unwrap();
    assert!(resolved.is_resolved());

    let again = alerts
        .resolve(first.id, "planner@supplychainx.io", None, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(SupplyChainError::from(again).http_status_code(), 409);

    // resolved alerts no longer block a new one
    assert!(alerts.insert(&alert).await.unwrap().is_some());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_audit_chain_survives_round_trip() {
    let pool = pool().await;
    let audit = AuditRepository::new(pool.clone());

    for i in 0..3 {
        audit
            .record(AuditEntry::new(
                AuditAction::Update,
                "raw_material",
                Some(i),
                Some("admin@supplychainx.io".to_string()),
                serde_json::json!({ "stock": i * 5, "note": "restock" }),
            ))
            .await
            .unwrap();
    }

    let verification = audit.verify_chain().await.unwrap();
    assert!(verification.is_valid, "broken links: {:?}", verification.broken_links);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Requires PostgreSQL
async fn test_parallel_failed_logins_are_all_counted() {
    let users = UserRepository::new(pool().await);
    let email = format!("{}@supplychainx.io", unique("buyer"));
    let user = users
        .create("Chloe", "Bernard", &email, "not-a-real-hash", Role::SalesManager)
        .await
        .unwrap();
    let policy = LockoutPolicy::default();
    let id = user.id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let users = users.clone();
            tokio::spawn(async move { users.record_failed_login(id, &policy, Utc::now()).await })
        })
        .collect();

    let mut newly_locked = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().newly_locked {
            newly_locked += 1;
        }
    }

    let stored = users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, policy.max_failed_attempts);
    assert!(stored.is_locked(Utc::now()));
    assert_eq!(newly_locked, 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_successful_login_cannot_clear_an_active_lock() {
    let users = UserRepository::new(pool().await);
    let email = format!("{}@supplychainx.io", unique("planner"));
    let user = users
        .create("Hugo", "Petit", &email, "not-a-real-hash", Role::ProductionPlanner)
        .await
        .unwrap();
    let policy = LockoutPolicy::default();

    for _ in 0..policy.max_failed_attempts {
        users.record_failed_login(user.id, &policy, Utc::now()).await.unwrap();
    }

    let err = users.record_successful_login(user.id, true, Utc::now()).await.unwrap_err();
    assert_eq!(SupplyChainError::from(err).http_status_code(), 423);

    let stored = users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, policy.max_failed_attempts);
    assert!(stored.last_login_at.is_none());
}
