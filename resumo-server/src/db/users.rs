//! User and linked-account queries

use chrono::{DateTime, Utc};
use resumo_common::auth::hash_password;
use resumo_common::db::{SubscriptionPlan, User, UserRole, UserStatus};
use resumo_common::{time, uuid_utils, Error, Result};
use sqlx::SqlitePool;

/// Provider name for e-mail + password accounts
pub const LOCAL_PROVIDER: &str = "credentials";

/// Create a local user with its `credentials` account and gamification row.
///
/// Returns `None` when the e-mail is already registered.
pub async fn create_local_user(
    pool: &SqlitePool,
    email: &str,
    display_name: &str,
    password: &str,
) -> Result<Option<User>> {
    let password = password.to_string();
    let (password_hash, password_salt) = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))??;
    let guid = uuid_utils::generate();
    let now = time::now();

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (guid, email, display_name, password_hash, password_salt, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(email)
    .bind(display_name)
    .bind(&password_hash)
    .bind(&password_salt)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    sqlx::query(
        r#"
        INSERT INTO accounts (guid, user_id, provider, provider_account_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate())
    .bind(&guid)
    .bind(LOCAL_PROVIDER)
    .bind(email)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO user_gamification (user_id, updated_at) VALUES (?, ?)")
        .bind(&guid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE guid = ?")
        .bind(&guid)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(user))
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE guid = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Returns false if no user has this e-mail
pub async fn set_subscription(
    pool: &SqlitePool,
    email: &str,
    plan: SubscriptionPlan,
    expires_at: Option<DateTime<Utc>>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET subscription_plan = ?, subscription_expires_at = ?, updated_at = ? WHERE email = ?",
    )
    .bind(plan)
    .bind(expires_at)
    .bind(time::now())
    .bind(email)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_role(pool: &SqlitePool, email: &str, role: UserRole) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE email = ?")
        .bind(role)
        .bind(time::now())
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Blocking a user also ends their sessions
pub async fn set_status(pool: &SqlitePool, email: &str, status: UserStatus) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE email = ?")
        .bind(status)
        .bind(time::now())
        .bind(email)
        .execute(&mut *tx)
        .await?;

    if status == UserStatus::Blocked {
        sqlx::query("DELETE FROM sessions WHERE user_id IN (SELECT guid FROM users WHERE email = ?)")
            .bind(email)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
