use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/health/detailed", get(health::detailed_health_check))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/raw-materials", raw_material_routes())
        .nest("/supply-orders", supply_order_routes())
        .nest("/products", product_routes())
        .nest("/production-orders", production_order_routes())
        .nest("/customers", customer_routes())
        .nest("/orders", order_routes())
        .nest("/deliveries", delivery_routes())
        .nest("/stock-alerts", stock_alert_routes())
        .nest("/audit", audit_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", get(users::get_user).delete(users::delete_user))
        .route("/:id/role", put(users::update_role))
        .route("/:id/enabled", put(users::set_enabled))
        .route("/:id/unlock", post(users::unlock_user))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(suppliers::list_suppliers).post(suppliers::create_supplier))
        .route(
            "/:id",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
}

fn raw_material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(raw_materials::list_materials).post(raw_materials::create_material))
        .route("/low-stock", get(raw_materials::list_below_minimum))
        .route(
            "/:id",
            get(raw_materials::get_material)
                .put(raw_materials::update_material)
                .delete(raw_materials::delete_material),
        )
}

fn supply_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(supply_orders::list_orders).post(supply_orders::create_order))
        .route("/:id", get(supply_orders::get_order).delete(supply_orders::delete_order))
        .route("/:id/status", put(supply_orders::update_status))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route(
            "/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/:id/bom", get(products::list_bom).post(products::add_bom_line))
        .route("/:id/bom/import", post(products::import_bom))
        .route("/:id/bom/:line_id", delete(products::delete_bom_line))
}

fn production_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(production_orders::list_orders).post(production_orders::create_order))
        .route(
            "/:id",
            get(production_orders::get_order).delete(production_orders::delete_order),
        )
        .route("/:id/feasibility", get(production_orders::feasibility))
        .route("/:id/start", post(production_orders::start_order))
        .route("/:id/complete", post(production_orders::complete_order))
        .route("/:id/cancel", post(production_orders::cancel_order))
}

fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::list_customers).post(customers::create_customer))
        .route(
            "/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/:id/cancel", post(orders::cancel_order))
}

fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(deliveries::list_deliveries).post(deliveries::create_delivery))
        .route("/:id", get(deliveries::get_delivery).delete(deliveries::delete_delivery))
        .route("/:id/status", put(deliveries::update_status))
}

fn stock_alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stock_alerts::list_alerts))
        .route("/summary", get(stock_alerts::summary))
        .route("/:id", get(stock_alerts::get_alert))
        .route("/:id/resolve", post(stock_alerts::resolve_alert))
}

fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(audit::list_entries))
        .route("/verify", get(audit::verify))
}
