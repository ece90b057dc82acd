//! Credential checks shared by `POST /auth/login` and header authentication.

pub mod password;

use chrono::Utc;
use serde_json::json;
use supplychainx_models::{AuditAction, AuditEntry, User};
use supplychainx_utils::SupplyChainError;

use crate::{error::ApiResult, AppState};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// How a successful check is recorded on the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginKind {
    /// Explicit login: stamps `last_login_at`.
    Interactive,
    /// Per-request header credentials: only clears a pending failure count.
    Request,
}

/// Lockout-aware credential check.
///
/// A locked account is refused before the password is looked at. A wrong
/// password counts towards the lockout threshold and the account is locked
/// once the threshold is reached. Counter updates happen under a row lock, so
/// parallel guesses are all counted.
pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
    kind: LoginKind,
) -> ApiResult<User> {
    let now = Utc::now();
    let users = &state.repos.users;

    let user = match users.find_by_email(email).await? {
        Some(user) => user,
        None => return Err(SupplyChainError::authentication(INVALID_CREDENTIALS).into()),
    };

    if !user.enabled {
        return Err(SupplyChainError::authentication("Account is disabled").into());
    }

    if let Some(locked_until) = user.locked_until.filter(|_| user.is_locked(now)) {
        return Err(SupplyChainError::account_locked(locked_until).into());
    }

    let valid = password::verify_password(password, &user.password_hash).map_err(|e| {
        SupplyChainError::internal(format!("Stored password hash for user {} is unreadable: {}", user.id, e))
    })?;

    if !valid {
        let failed = users.record_failed_login(user.id, &state.lockout_policy, now).await?;
        let user = failed.user;

        if let Some(locked_until) = user.locked_until.filter(|_| user.is_locked(now)) {
            if failed.newly_locked {
                tracing::warn!(user_id = user.id, %locked_until, "Account locked after repeated failed logins");
                record_login_event(state, &user, AuditAction::AccountLocked).await;
            }
            return Err(SupplyChainError::account_locked(locked_until).into());
        }

        record_login_event(state, &user, AuditAction::LoginFailed).await;
        return Err(SupplyChainError::authentication(INVALID_CREDENTIALS).into());
    }

    match kind {
        LoginKind::Interactive => {
            let user = users.record_successful_login(user.id, true, now).await?;
            record_login_event(state, &user, AuditAction::Login).await;
            Ok(user)
        }
        LoginKind::Request if user.failed_login_attempts > 0 || user.locked_until.is_some() => {
            Ok(users.record_successful_login(user.id, false, now).await?)
        }
        LoginKind::Request => Ok(user),
    }
}

async fn record_login_event(state: &AppState, user: &User, action: AuditAction) {
    let entry = AuditEntry::new(
        action,
        "user",
        Some(user.id),
        Some(user.email.clone()),
        json!({ "failed_login_attempts": user.failed_login_attempts }),
    );
    crate::audit::record_entry(state, entry).await;
}

#[cfg(test)]
mod tests {
    // Lockout flow against a live database:
    // `DATABASE_URL=postgres://... cargo test -p supplychainx-api -- --ignored`

    use super::*;
    use chrono::Duration;
    use supplychainx_database::{initialize_database, DatabaseConfig};
    use supplychainx_models::Role;
    use supplychainx_utils::AppConfig;

    const PASSWORD: &str = "warehouse-42";

    async fn state() -> AppState {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let pool = initialize_database(&DatabaseConfig {
            postgres_url: url,
            ..Default::default()
        })
        .await
        .expect("database should initialize");
        AppState::new(pool, AppConfig::default()).unwrap()
    }

    async fn user(state: &AppState) -> User {
        let email = format!("planner-{}@supplychainx.io", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let hash = password::hash_password(PASSWORD).unwrap();
        state
            .repos
            .users
            .create("Lea", "Martin", &email, &hash, Role::ProductionPlanner)
            .await
            .unwrap()
    }

    async fn status(state: &AppState, email: &str, password: &str, kind: LoginKind) -> u16 {
        match authenticate(state, email, password, kind).await {
            Ok(_) => 200,
            Err(err) => err.0.http_status_code(),
        }
    }

    async fn reload(state: &AppState, id: i64) -> User {
        state.repos.users.find_by_id(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_fifth_failure_locks_and_locked_account_refuses_correct_password() {
        let state = state().await;
        let user = user(&state).await;

        for _ in 0..4 {
            assert_eq!(status(&state, &user.email, "wrong", LoginKind::Interactive).await, 401);
        }
        assert_eq!(status(&state, &user.email, "wrong", LoginKind::Interactive).await, 423);
        assert_eq!(status(&state, &user.email, PASSWORD, LoginKind::Interactive).await, 423);

        let stored = reload(&state, user.id).await;
        assert_eq!(stored.failed_login_attempts, 5);
        assert!(stored.is_locked(Utc::now()));
        assert!(stored.last_login_at.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_expired_lock_lets_correct_password_in_and_resets_counters() {
        let state = state().await;
        let user = user(&state).await;

        for _ in 0..5 {
            status(&state, &user.email, "wrong", LoginKind::Interactive).await;
        }
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(user.id)
            .bind(Utc::now() - Duration::minutes(1))
            .execute(&state.pool)
            .await
            .unwrap();

        let logged_in = authenticate(&state, &user.email, PASSWORD, LoginKind::Interactive)
            .await
            .unwrap();
        assert_eq!(logged_in.failed_login_attempts, 0);
        assert!(logged_in.locked_until.is_none());

        let stored = reload(&state, user.id).await;
        assert_eq!(stored.failed_login_attempts, 0);
        assert!(stored.locked_until.is_none());
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_failure_after_expired_lock_starts_a_fresh_count() {
        let state = state().await;
        let user = user(&state).await;

        for _ in 0..5 {
            status(&state, &user.email, "wrong", LoginKind::Interactive).await;
        }
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(user.id)
            .bind(Utc::now() - Duration::minutes(1))
            .execute(&state.pool)
            .await
            .unwrap();

        assert_eq!(status(&state, &user.email, "wrong", LoginKind::Interactive).await, 401);
        let stored = reload(&state, user.id).await;
        assert_eq!(stored.failed_login_attempts, 1);
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL
    async fn test_header_credentials_clear_failures_without_stamping_login() {
        let state = state().await;
        let user = user(&state).await;

        for _ in 0..2 {
            assert_eq!(status(&state, &user.email, "wrong", LoginKind::Request).await, 401);
        }
        assert_eq!(reload(&state, user.id).await.failed_login_attempts, 2);

        assert_eq!(status(&state, &user.email, PASSWORD, LoginKind::Request).await, 200);
        let stored = reload(&state, user.id).await;
        assert_eq!(stored.failed_login_attempts, 0);
        assert!(stored.last_login_at.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore] // Requires PostgreSQL
    async fn test_parallel_wrong_passwords_lock_the_account() {
        let state = state().await;
        let user = user(&state).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                let email = user.email.clone();
                tokio::spawn(async move { status(&state, &email, "wrong", LoginKind::Interactive).await })
            })
            .collect();

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap());
        }
        assert_eq!(statuses.iter().filter(|s| **s == 401).count(), 4);
        assert_eq!(statuses.iter().filter(|s| **s == 423).count(), 4);

        let stored = reload(&state, user.id).await;
        assert_eq!(stored.failed_login_attempts, 5);
        assert!(stored.is_locked(Utc::now()));
        assert_eq!(status(&state, &user.email, PASSWORD, LoginKind::Interactive).await, 423);
    }
}
