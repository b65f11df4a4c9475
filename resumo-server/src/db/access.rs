//! Free-tier unlock ledger and access fact loading

use resumo_common::access::{self, AccessDecision, AccessFacts};
use resumo_common::db::{settings, Item, User};
use resumo_common::{time, Result};
use sqlx::SqlitePool;

/// Gather the facts for `user` reading `item` and decide
pub async fn evaluate(pool: &SqlitePool, user: &User, item: &Item) -> Result<(AccessDecision, AccessFacts)> {
    let already_unlocked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM item_access WHERE user_id = ? AND item_id = ?)",
    )
    .bind(&user.guid)
    .bind(&item.guid)
    .fetch_one(pool)
    .await?;

    let unlocked_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item_access WHERE user_id = ?")
        .bind(&user.guid)
        .fetch_one(pool)
        .await?;

    let facts = AccessFacts {
        role: user.role,
        plan: user.subscription_plan,
        subscription_expires_at: user.subscription_expires_at,
        item_is_free: item.is_free,
        item_published: item.published,
        already_unlocked,
        unlocked_count,
        free_limit: settings::free_items_limit(pool).await?,
        now: time::now(),
    };

    Ok((access::decide(&facts), facts))
}

/// Add an item to the user's unlock ledger if the quota still allows it.
///
/// The count check and the insert are one statement, so concurrent reads
/// cannot push the ledger past `free_limit`. Returns `false` when the quota
/// is exhausted and the item is not already in the ledger.
pub async fn claim_unlock(pool: &SqlitePool, user_id: &str, item_id: &str, free_limit: i64) -> Result<bool> {
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO item_access (user_id, item_id, first_accessed_at)
        SELECT ?, ?, ?
        WHERE (SELECT COUNT(*) FROM item_access WHERE user_id = ?) < ?
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(time::now())
    .bind(user_id)
    .bind(free_limit)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        return Ok(true);
    }

    // A concurrent read of the same item may have claimed it first
    let unlocked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM item_access WHERE user_id = ? AND item_id = ?)",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_one(pool)
    .await?;
    Ok(unlocked)
}
