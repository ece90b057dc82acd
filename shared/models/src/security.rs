//! Users, roles and the role → permission table.
//!
//! Permissions are resolved by looking the role up in [`ROLE_PERMISSIONS`];
//! administrators implicitly hold every permission.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

text_enum! {
    pub enum Role {
        Admin => "ADMIN",
        PurchasingManager => "PURCHASING_MANAGER",
        SupplySupervisor => "SUPPLY_SUPERVISOR",
        ProductionManager => "PRODUCTION_MANAGER",
        ProductionPlanner => "PRODUCTION_PLANNER",
        ProductionSupervisor => "PRODUCTION_SUPERVISOR",
        SalesManager => "SALES_MANAGER",
        LogisticsManager => "LOGISTICS_MANAGER",
        DeliverySupervisor => "DELIVERY_SUPERVISOR",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "supplier:read")]
    SupplierRead,
    #[serde(rename = "supplier:write")]
    SupplierWrite,
    #[serde(rename = "material:read")]
    MaterialRead,
    #[serde(rename = "material:write")]
    MaterialWrite,
    #[serde(rename = "supply_order:read")]
    SupplyOrderRead,
    #[serde(rename = "supply_order:write")]
    SupplyOrderWrite,
    #[serde(rename = "product:read")]
    ProductRead,
    #[serde(rename = "product:write")]
    ProductWrite,
    #[serde(rename = "production_order:read")]
    ProductionOrderRead,
    #[serde(rename = "production_order:write")]
    ProductionOrderWrite,
    #[serde(rename = "customer:read")]
    CustomerRead,
    #[serde(rename = "customer:write")]
    CustomerWrite,
    #[serde(rename = "order:read")]
    OrderRead,
    #[serde(rename = "order:write")]
    OrderWrite,
    #[serde(rename = "delivery:read")]
    DeliveryRead,
    #[serde(rename = "delivery:write")]
    DeliveryWrite,
    #[serde(rename = "alert:read")]
    AlertRead,
    #[serde(rename = "alert:resolve")]
    AlertResolve,
    #[serde(rename = "audit:read")]
    AuditRead,
    #[serde(rename = "user:manage")]
    UserManage,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::SupplierRead,
        Permission::SupplierWrite,
        Permission::MaterialRead,
        Permission::MaterialWrite,
        Permission::SupplyOrderRead,
        Permission::SupplyOrderWrite,
        Permission::ProductRead,
        Permission::ProductWrite,
        Permission::ProductionOrderRead,
        Permission::ProductionOrderWrite,
        Permission::CustomerRead,
        Permission::CustomerWrite,
        Permission::OrderRead,
        Permission::OrderWrite,
        Permission::DeliveryRead,
        Permission::DeliveryWrite,
        Permission::AlertRead,
        Permission::AlertResolve,
        Permission::AuditRead,
        Permission::UserManage,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Permission::SupplierRead => "supplier:read",
            Permission::SupplierWrite => "supplier:write",
            Permission::MaterialRead => "material:read",
            Permission::MaterialWrite => "material:write",
            Permission::SupplyOrderRead => "supply_order:read",
            Permission::SupplyOrderWrite => "supply_order:write",
            Permission::ProductRead => "product:read",
            Permission::ProductWrite => "product:write",
            Permission::ProductionOrderRead => "production_order:read",
            Permission::ProductionOrderWrite => "production_order:write",
            Permission::CustomerRead => "customer:read",
            Permission::CustomerWrite => "customer:write",
            Permission::OrderRead => "order:read",
            Permission::OrderWrite => "order:write",
            Permission::DeliveryRead => "delivery:read",
            Permission::DeliveryWrite => "delivery:write",
            Permission::AlertRead => "alert:read",
            Permission::AlertResolve => "alert:resolve",
            Permission::AuditRead => "audit:read",
            Permission::UserManage => "user:manage",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

use Permission::*;

pub static ROLE_PERMISSIONS: &[(Role, &[Permission])] = &[
    (Role::Admin, Permission::ALL),
    (
        Role::PurchasingManager,
        &[
            SupplierRead, SupplierWrite, MaterialRead, MaterialWrite,
            SupplyOrderRead, SupplyOrderWrite, AlertRead, AlertResolve,
        ],
    ),
    (
        Role::SupplySupervisor,
        &[SupplierRead, MaterialRead, SupplyOrderRead, AlertRead],
    ),
    (
        Role::ProductionManager,
        &[
            MaterialRead, ProductRead, ProductWrite, ProductionOrderRead,
            ProductionOrderWrite, AlertRead, AlertResolve,
        ],
    ),
    (
        Role::ProductionPlanner,
        &[MaterialRead, ProductRead, ProductionOrderRead, ProductionOrderWrite, AlertRead],
    ),
    (
        Role::ProductionSupervisor,
        &[MaterialRead, ProductRead, ProductionOrderRead, AlertRead],
    ),
    (
        Role::SalesManager,
        &[ProductRead, CustomerRead, CustomerWrite, OrderRead, OrderWrite],
    ),
    (
        Role::LogisticsManager,
        &[CustomerRead, OrderRead, OrderWrite, DeliveryRead, DeliveryWrite, AlertRead],
    ),
    (
        Role::DeliverySupervisor,
        &[CustomerRead, OrderRead, DeliveryRead],
    ),
];

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        ROLE_PERMISSIONS
            .iter()
            .find(|(role, _)| role == self)
            .map(|(_, permissions)| *permissions)
            .unwrap_or(&[])
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Failed-login threshold and lock duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    /// Records a failed login. Returns true when this failure locks the account.
    pub fn register_failed_login(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        // an expired lock starts a fresh count
        if matches!(self.locked_until, Some(until) if until <= now) {
            self.locked_until = None;
            self.failed_login_attempts = 0;
        }

        self.failed_login_attempts += 1;
        self.updated_at = now;

        if self.failed_login_attempts >= policy.max_failed_attempts {
            self.locked_until = Some(now + policy.lockout_duration);
            return true;
        }
        false
    }

    pub fn register_successful_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "User email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Login email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            first_name: "Nadia".to_string(),
            last_name: "Benali".to_string(),
            email: "nadia@supplychainx.io".to_string(),
            password_hash: String::new(),
            role: Role::ProductionPlanner,
            enabled: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_five_failures_lock_for_fifteen_minutes() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let mut user = user();

        for _ in 0..4 {
            assert!(!user.register_failed_login(&policy, now));
        }
        assert!(!user.is_locked(now));

        assert!(user.register_failed_login(&policy, now));
        assert_eq!(user.failed_login_attempts, 5);
        assert_eq!(user.locked_until, Some(now + Duration::minutes(15)));
        assert!(user.is_locked(now + Duration::minutes(14)));
        assert!(!user.is_locked(now + Duration::minutes(15)));
    }

    #[test]
    fn test_success_resets_counter_and_lock() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let mut user = user();
        user.register_failed_login(&policy, now);
        user.register_failed_login(&policy, now);

        user.register_successful_login(now);
        assert_eq!(user.failed_login_attempts, 0);
        assert!(user.locked_until.is_none());
        assert_eq!(user.last_login_at, Some(now));
    }

    #[test]
    fn test_failure_after_expired_lock_starts_fresh_count() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let mut user = user();
        for _ in 0..5 {
            user.register_failed_login(&policy, now);
        }

        let later = now + Duration::minutes(20);
        assert!(!user.register_failed_login(&policy, later));
        assert_eq!(user.failed_login_attempts, 1);
        assert!(!user.is_locked(later));
    }

    #[test]
    fn test_unlock_clears_lock() {
        let policy = LockoutPolicy::default();
        let now = Utc::now();
        let mut user = user();
        for _ in 0..5 {
            user.register_failed_login(&policy, now);
        }
        user.unlock(now);
        assert!(!user.is_locked(now));
        assert_eq!(user.failed_login_attempts, 0);
    }

    #[test]
    fn test_admin_has_every_permission() {
        for permission in Permission::ALL {
            assert!(Role::Admin.has_permission(*permission), "{}", permission);
        }
    }

    #[test]
    fn test_role_table_lookup() {
        assert!(Role::ProductionPlanner.has_permission(ProductionOrderWrite));
        assert!(!Role::ProductionSupervisor.has_permission(ProductionOrderWrite));
        assert!(Role::PurchasingManager.has_permission(SupplyOrderWrite));
        assert!(!Role::SalesManager.has_permission(AuditRead));
        assert!(!Role::LogisticsManager.has_permission(UserManage));
    }

    #[test]
    fn test_every_role_is_in_table() {
        for role in Role::ALL {
            assert!(!role.permissions().is_empty(), "{} has no permissions", role);
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let mut user = user();
        user.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
