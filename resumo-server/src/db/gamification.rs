//! Gamification persistence: counters, badges, leaderboard

use chrono::{DateTime, NaiveDate, Utc};
use resumo_common::db::UserGamification;
use resumo_common::gamification::{Activity, Badge, GamificationStats};
use resumo_common::{time, Result};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

/// Result of recording one activity
#[derive(Debug, Clone)]
pub struct ActivityOutcome {
    pub points_awarded: i64,
    pub total_points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub new_badges: Vec<Badge>,
}

impl ActivityOutcome {
    /// Fold a later outcome of the same request into this one
    pub fn merge(&mut self, later: ActivityOutcome) {
        self.points_awarded += later.points_awarded;
        self.total_points = later.total_points;
        self.level = later.level;
        self.current_streak = later.current_streak;
        self.new_badges.extend(later.new_badges);
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
    pub level: i64,
    pub longest_streak: i64,
}

#[derive(Debug, Clone, FromRow)]
struct BadgeRow {
    badge: String,
    awarded_at: DateTime<Utc>,
}

fn stats_from_row(row: &UserGamification) -> GamificationStats {
    GamificationStats {
        points: row.points,
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        last_activity_date: row.last_activity_date,
        items_completed: row.items_completed,
        quiz_correct: row.quiz_correct,
    }
}

/// Stored counters for a user; zeros if the row does not exist
pub async fn load_stats(conn: &mut SqliteConnection, user_id: &str) -> Result<GamificationStats> {
    let row = sqlx::query_as::<_, UserGamification>("SELECT * FROM user_gamification WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(stats_from_row).unwrap_or_default())
}

/// Write counters and derived level
pub async fn save_stats(
    conn: &mut SqliteConnection,
    user_id: &str,
    stats: &GamificationStats,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_gamification
            (user_id, points, level, current_streak, longest_streak, last_activity_date,
             items_completed, quiz_correct, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id) DO UPDATE SET
            points = excluded.points,
            level = excluded.level,
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_activity_date = excluded.last_activity_date,
            items_completed = excluded.items_completed,
            quiz_correct = excluded.quiz_correct,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(stats.points)
    .bind(stats.level())
    .bind(stats.current_streak)
    .bind(stats.longest_streak)
    .bind(stats.last_activity_date)
    .bind(stats.items_completed)
    .bind(stats.quiz_correct)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert every badge the counters qualify for; returns the ones that are new
pub async fn award_badges(
    conn: &mut SqliteConnection,
    user_id: &str,
    stats: &GamificationStats,
) -> Result<Vec<Badge>> {
    let mut awarded = Vec::new();
    let now = time::now();

    for badge in stats.earned_badges() {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_badges (user_id, badge, awarded_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(badge.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            debug!("Awarded badge {} to {}", badge, user_id);
            awarded.push(badge);
        }
    }

    Ok(awarded)
}

/// Apply one activity to a user's counters.
///
/// Run inside the caller's transaction so counters and the triggering
/// write commit together.
pub async fn record_activity(
    conn: &mut SqliteConnection,
    user_id: &str,
    activity: Activity,
    today: NaiveDate,
    award_points: bool,
) -> Result<ActivityOutcome> {
    let mut stats = load_stats(conn, user_id).await?;
    let points_awarded = stats.apply(activity, today, award_points);
    save_stats(conn, user_id, &stats).await?;
    let new_badges = award_badges(conn, user_id, &stats).await?;

    Ok(ActivityOutcome {
        points_awarded,
        total_points: stats.points,
        level: stats.level(),
        current_streak: stats.current_streak,
        new_badges,
    })
}

pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<UserGamification>> {
    let row = sqlx::query_as::<_, UserGamification>("SELECT * FROM user_gamification WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Badges in award order
pub async fn badges(pool: &SqlitePool, user_id: &str) -> Result<Vec<(Badge, DateTime<Utc>)>> {
    let rows = sqlx::query_as::<_, BadgeRow>(
        "SELECT badge, awarded_at FROM user_badges WHERE user_id = ? ORDER BY awarded_at, badge",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut badges = Vec::with_capacity(rows.len());
    for row in rows {
        match row.badge.parse::<Badge>() {
            Ok(badge) => badges.push((badge, row.awarded_at)),
            Err(e) => warn!("Skipping stored badge for {}: {}", user_id, e),
        }
    }
    Ok(badges)
}

const LEADERBOARD_ORDER: &str = "user_gamification.points DESC, user_gamification.longest_streak DESC, users.created_at ASC, users.guid ASC";

/// Top active users by points
pub async fn leaderboard(pool: &SqlitePool, limit: i64) -> Result<Vec<LeaderboardRow>> {
    let sql = format!(
        r#"
        SELECT users.guid AS user_id, users.display_name, user_gamification.points,
               user_gamification.level, user_gamification.longest_streak
        FROM user_gamification
        JOIN users ON users.guid = user_gamification.user_id
        WHERE users.status = 'active'
        ORDER BY {}
        LIMIT ?
        "#,
        LEADERBOARD_ORDER
    );
    let rows = sqlx::query_as::<_, LeaderboardRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// 1-based position of a user in the full leaderboard ordering.
///
/// Counts the active users that sort ahead under the same keys as
/// `LEADERBOARD_ORDER`. `None` for blocked users and users without a row.
pub async fn rank_of(pool: &SqlitePool, user_id: &str) -> Result<Option<i64>> {
    let rank = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT 1 + (
            SELECT COUNT(*)
            FROM user_gamification g
            JOIN users u ON u.guid = g.user_id
            WHERE u.status = 'active'
              AND (g.points > me.points
                OR (g.points = me.points AND g.longest_streak > me.longest_streak)
                OR (g.points = me.points AND g.longest_streak = me.longest_streak
                    AND u.created_at < me_user.created_at)
                OR (g.points = me.points AND g.longest_streak = me.longest_streak
                    AND u.created_at = me_user.created_at AND u.guid < me_user.guid))
        )
        FROM user_gamification me
        JOIN users me_user ON me_user.guid = me.user_id
        WHERE me.user_id = ? AND me_user.status = 'active'
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(rank)
}
