//! Repository module for database CRUD operations
//!
//! Provides typed repository implementations for all domain entities.

pub mod audit;
pub mod bill_of_material;
pub mod customer;
pub mod customer_order;
pub mod delivery;
pub mod product;
pub mod production_order;
pub mod raw_material;
pub mod stock_alert;
pub mod stock_level;
pub mod supplier;
pub mod supply_order;
pub mod user;

pub use audit::{AuditFilter, AuditRepository};
pub use bill_of_material::BillOfMaterialRepository;
pub use customer::CustomerRepository;
pub use customer_order::CustomerOrderRepository;
pub use delivery::DeliveryRepository;
pub use product::ProductRepository;
pub use production_order::ProductionOrderRepository;
pub use raw_material::RawMaterialRepository;
pub use stock_alert::{StockAlertFilter, StockAlertRepository};
pub use stock_level::StockLevelRepository;
pub use supplier::SupplierRepository;
pub use supply_order::SupplyOrderRepository;
pub use user::{FailedLogin, UserRepository};
