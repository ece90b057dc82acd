//! Property-based tests for the stock, production, lockout and permission rules.

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::{
    check_feasibility, classify_stock_level, FeasibilityError, LockoutPolicy, MaterialRequirement, Permission,
    Role, StockAlert, StockLevel, StockSnapshot, StockedEntityType, User,
};

prop_compose! {
    fn arb_shortage()(minimum in 1..10_000i32)(current in 0..minimum, minimum in Just(minimum)) -> (i32, i32) {
        (current, minimum)
    }
}

prop_compose! {
    fn arb_requirement()(
        material_id in 1..20i64,
        required_per_unit in 1..50i32,
        available_stock in 0..5_000i32,
    ) -> MaterialRequirement {
        MaterialRequirement {
            material_id,
            material_name: format!("material-{}", material_id),
            required_per_unit,
            available_stock,
        }
    }
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn user(role: Role) -> User {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    User {
        id: 1,
        first_name: "Ines".to_string(),
        last_name: "Moreau".to_string(),
        email: "ines@supplychainx.io".to_string(),
        password_hash: String::new(),
        role,
        enabled: true,
        failed_login_attempts: 0,
        locked_until: None,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_classification_matches_thresholds((current, minimum) in arb_shortage()) {
        let level = classify_stock_level(current, minimum);

        prop_assert_eq!(level == StockLevel::OutOfStock, current == 0);
        prop_assert_eq!(level == StockLevel::Critical, current > 0 && current < minimum / 2);
        prop_assert_eq!(level == StockLevel::Low, current > 0 && current >= minimum / 2);
    }

    #[test]
    fn prop_feasibility_aggregates_per_material(
        quantity in 1..100i32,
        lines in prop::collection::vec(arb_requirement(), 0..8),
    ) {
        // rows for one material share its stock
        let mut lines = lines;
        let mut stock_by_material: BTreeMap<i64, i32> = BTreeMap::new();
        for line in &mut lines {
            line.available_stock = *stock_by_material.entry(line.material_id).or_insert(line.available_stock);
        }

        let mut required: BTreeMap<i64, i64> = BTreeMap::new();
        for line in &lines {
            *required.entry(line.material_id).or_insert(0) += i64::from(line.required_per_unit) * i64::from(quantity);
        }
        let short: Vec<i64> = required
            .iter()
            .filter(|(id, total)| **total > i64::from(stock_by_material[*id]))
            .map(|(id, _)| *id)
            .collect();

        match check_feasibility(quantity, &lines) {
            Ok(plan) => {
                prop_assert!(short.is_empty());
                let planned: BTreeMap<i64, i64> = plan.iter().map(|c| (c.material_id, c.quantity)).collect();
                prop_assert_eq!(planned, required);
            }
            Err(FeasibilityError::InsufficientStock(shortfalls)) => {
                let ids: Vec<i64> = shortfalls.iter().map(|s| s.material_id).collect();
                prop_assert_eq!(ids, short);
                for shortfall in &shortfalls {
                    prop_assert_eq!(shortfall.required, required[&shortfall.material_id]);
                    prop_assert_eq!(shortfall.available, i64::from(stock_by_material[&shortfall.material_id]));
                }
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_consecutive_failures_lock_at_threshold(
        max_failed_attempts in 1..10i32,
        failures in 0..15i32,
    ) {
        let policy = LockoutPolicy { max_failed_attempts, lockout_duration: Duration::minutes(15) };
        let mut user = user(Role::SalesManager);
        let now = user.created_at;

        let mut lock_events = 0;
        for _ in 0..failures {
            if user.register_failed_login(&policy, now) {
                lock_events += 1;
            }
        }

        prop_assert_eq!(user.failed_login_attempts, failures);
        prop_assert_eq!(user.is_locked(now), failures >= max_failed_attempts);
        prop_assert!(!user.is_locked(now + Duration::minutes(15)));
        prop_assert_eq!(lock_events > 0, failures >= max_failed_attempts);

        user.register_successful_login(now);
        prop_assert_eq!(user.failed_login_attempts, 0);
        prop_assert!(user.locked_until.is_none());
        prop_assert_eq!(user.last_login_at, Some(now));
    }

    #[test]
    fn prop_alert_resolution_state_is_consistent(
        (current, minimum) in arb_shortage(),
        resolve in any::<bool>(),
        resolver in "[a-z]{1,12}@supplychainx\\.io",
    ) {
        let mut alert = StockAlert::raise(&StockSnapshot {
            entity_type: StockedEntityType::Product,
            entity_id: 5,
            entity_name: "Desk".to_string(),
            current_stock: current,
            minimum_stock: minimum,
        });
        prop_assert_eq!(alert.is_critical(), current < minimum / 2 || current == 0);
        prop_assert!(!alert.is_resolved());

        if resolve {
            let at = alert.created_at + Duration::hours(2);
            prop_assert!(alert.resolve(resolver.clone(), None, at).is_ok());
            let resolution = alert.resolution.clone().unwrap();
            prop_assert_eq!(resolution.resolved_by, resolver.clone());
            prop_assert_eq!(resolution.resolved_at, at);
            prop_assert!(alert.resolve(resolver, None, at).is_err());
            prop_assert!(!alert.awaits_email(true));
        } else {
            prop_assert!(alert.resolution.is_none());
            prop_assert_eq!(alert.awaits_email(false), alert.is_critical());
        }
    }

    #[test]
    fn prop_role_permissions_come_from_the_table(role in arb_role()) {
        for permission in Permission::ALL {
            prop_assert_eq!(role.has_permission(*permission), role.permissions().contains(permission));
            prop_assert!(Role::Admin.has_permission(*permission));
        }
        prop_assert!(!role.permissions().is_empty());
        if role != Role::Admin {
            prop_assert!(!role.has_permission(Permission::UserManage));
        }
    }
}
