//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::sync_map::SyncEntry;

/// Implements `as_str`, `Display` and `FromStr` for a text-backed enum
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {} '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Reader,
    Admin,
}
text_enum!(UserRole { Reader => "reader", Admin => "admin" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}
text_enum!(UserStatus { Active => "active", Blocked => "blocked" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Premium,
}
text_enum!(SubscriptionPlan { Free => "free", Premium => "premium" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReadingFormat {
    Text,
    Audio,
    Pdf,
}
text_enum!(ReadingFormat { Text => "text", Audio => "audio", Pdf => "pdf" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Sepia,
}
text_enum!(Theme { Light => "light", Dark => "dark", Sepia => "sepia" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReadingEventKind {
    ItemOpened,
    SectionRead,
    AudioListened,
}
text_enum!(ReadingEventKind {
    ItemOpened => "item_opened",
    SectionRead => "section_read",
    AudioListened => "audio_listened",
});

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub guid: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-in method linked to a user (`credentials` for local accounts)
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub guid: String,
    pub user_id: String,
    pub provider: String,
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Item {
    pub guid: String,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub synopsis: String,
    pub cover_file: Option<String>,
    pub pdf_file: Option<String>,
    pub is_free: bool,
    pub published: bool,
    pub reading_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SummarySection {
    pub guid: String,
    pub item_id: String,
    pub position: i64,
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct AudioTrack {
    pub guid: String,
    pub item_id: String,
    pub file_name: String,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredSyncMap {
    pub item_id: String,
    pub entries: Json<Vec<SyncEntry>>,
    pub audio_duration_ms: i64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReadingProgress {
    pub user_id: String,
    pub item_id: String,
    pub section_index: i64,
    pub scroll_position: f64,
    pub audio_position_ms: i64,
    pub percent: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReadingEvent {
    pub guid: String,
    pub user_id: String,
    pub item_id: String,
    pub kind: ReadingEventKind,
    pub section_index: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferred_format: ReadingFormat,
    pub font_size: i64,
    pub theme: Theme,
    pub categories: Json<Vec<String>>,
    pub daily_goal_minutes: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub const DEFAULT_FONT_SIZE: i64 = 18;
    pub const DEFAULT_DAILY_GOAL_MINUTES: i64 = 15;

    /// Preferences for a user who never saved any
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferred_format: ReadingFormat::Text,
            font_size: Self::DEFAULT_FONT_SIZE,
            theme: Theme::Light,
            categories: Json(Vec::new()),
            daily_goal_minutes: Self::DEFAULT_DAILY_GOAL_MINUTES,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserGamification {
    pub user_id: String,
    pub points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub items_completed: i64,
    pub quiz_correct: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizQuestion {
    pub guid: String,
    pub item_id: String,
    pub position: i64,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub correct_index: i64,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditEntry {
    pub guid: String,
    pub user_id: Option<String>,
    pub action: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}
