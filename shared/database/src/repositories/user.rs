use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use supplychainx_models::{LockoutPolicy, Role, User};
use supplychainx_utils::SupplyChainError;

const COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, enabled, \
                       failed_login_attempts, locked_until, last_login_at, created_at, updated_at";

/// Emails are stored lower-cased and looked up the same way.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by ID")?;

        row.map(User::try_from).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", COLUMNS))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")?;

        row.map(User::try_from).transpose()
    }

    pub async fn find_all(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users ORDER BY email", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch users")?;

        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        Ok(row.0)
    }

    pub async fn create(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to create user")?;

        row.try_into()
    }

    /// Counts a failed login under a row lock, locking the account once the
    /// policy threshold is reached. An account that is already locked is
    /// returned unchanged, so concurrent failures cannot extend or skip the
    /// lock.
    pub async fn record_failed_login(
        &self,
        id: i64,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailedLogin> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut user = lock_user(&mut tx, id).await?;

        if user.is_locked(now) {
            tx.commit().await.context("Failed to commit login state")?;
            return Ok(FailedLogin { user, newly_locked: false });
        }

        let newly_locked = user.register_failed_login(policy, now);
        write_login_state(&mut tx, &user).await?;
        tx.commit().await.context("Failed to commit login state")?;

        Ok(FailedLogin { user, newly_locked })
    }

    /// Clears the failure count after a verified password, under a row lock.
    /// `stamp_login` also records `last_login_at`. Fails with `AccountLocked`
    /// when a concurrent failure locked the account in the meantime.
    pub async fn record_successful_login(&self, id: i64, stamp_login: bool, now: DateTime<Utc>) -> Result<User> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let mut user = lock_user(&mut tx, id).await?;

        if let Some(locked_until) = user.locked_until.filter(|_| user.is_locked(now)) {
            return Err(SupplyChainError::account_locked(locked_until).into());
        }

        if stamp_login {
            user.register_successful_login(now);
        } else if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            user.unlock(now);
        } else {
            return Ok(user);
        }

        write_login_state(&mut tx, &user).await?;
        tx.commit().await.context("Failed to commit login state")?;
        Ok(user)
    }

    pub async fn update_role(&self, id: i64, role: Role) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update user role")?;

        row.map(User::try_from).transpose()
    }

    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET enabled = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id)
        .bind(enabled)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update user status")?;

        row.map(User::try_from).transpose()
    }

    pub async fn unlock(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET failed_login_attempts = 0, locked_until = NULL, updated_at = $2
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to unlock user")?;

        row.map(User::try_from).transpose()
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Result of [`UserRepository::record_failed_login`].
#[derive(Debug, Clone)]
pub struct FailedLogin {
    pub user: User,
    /// True only for the failure that crossed the threshold.
    pub newly_locked: bool,
}

async fn lock_user(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<User> {
    let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", COLUMNS))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to lock user")?;

    match row {
        Some(row) => row.try_into(),
        None => Err(SupplyChainError::not_found(format!("User {}", id)).into()),
    }
}

async fn write_login_state(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            failed_login_attempts = $2,
            locked_until = $3,
            last_login_at = $4,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(user.failed_login_attempts)
    .bind(user.locked_until)
    .bind(user.last_login_at)
    .bind(user.updated_at)
    .execute(&mut **tx)
    .await
    .context("Failed to save login state")?;

    Ok(())
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    enabled: bool,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            enabled: row.enabled,
            failed_login_attempts: row.failed_login_attempts,
            locked_until: row.locked_until,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
