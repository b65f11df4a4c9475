//! Gamification rules: points, levels, streaks and badges
//!
//! Pure functions only; the server persists the results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Activity that can earn points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    ItemOpened,
    SectionRead,
    AudioListened,
    ItemCompleted,
    QuizCorrect,
}

impl Activity {
    pub fn points(self) -> i64 {
        match self {
            Activity::ItemOpened => 0,
            Activity::SectionRead => 5,
            Activity::AudioListened => 5,
            Activity::ItemCompleted => 50,
            Activity::QuizCorrect => 10,
        }
    }
}

/// Level for a point total: floor(sqrt(points / 100)) + 1
pub fn level_for_points(points: i64) -> i64 {
    let points = points.max(0);
    // Integer square root, corrected for float error at exact squares.
    let quotient = points / 100;
    let mut root = (quotient as f64).sqrt() as i64;
    while root * root > quotient {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= quotient {
        root += 1;
    }
    root + 1
}

/// Streak after activity on `today`.
///
/// Same day keeps the streak, the following day extends it, anything
/// else (first activity, a gap, or a clock that went backwards) restarts
/// at 1.
pub fn advance_streak(last_activity: Option<NaiveDate>, today: NaiveDate, current: i64) -> i64 {
    match last_activity {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

/// Badges that can be earned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstSummary,
    Bookworm,
    Scholar,
    WeekStreak,
    MonthStreak,
    QuizWhiz,
    Centurion,
}

impl Badge {
    pub const ALL: [Badge; 7] = [
        Badge::FirstSummary,
        Badge::Bookworm,
        Badge::Scholar,
        Badge::WeekStreak,
        Badge::MonthStreak,
        Badge::QuizWhiz,
        Badge::Centurion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Badge::FirstSummary => "first_summary",
            Badge::Bookworm => "bookworm",
            Badge::Scholar => "scholar",
            Badge::WeekStreak => "week_streak",
            Badge::MonthStreak => "month_streak",
            Badge::QuizWhiz => "quiz_whiz",
            Badge::Centurion => "centurion",
        }
    }

    fn earned_by(self, stats: &GamificationStats) -> bool {
        match self {
            Badge::FirstSummary => stats.items_completed >= 1,
            Badge::Bookworm => stats.items_completed >= 5,
            Badge::Scholar => stats.items_completed >= 25,
            Badge::WeekStreak => stats.longest_streak >= 7,
            Badge::MonthStreak => stats.longest_streak >= 30,
            Badge::QuizWhiz => stats.quiz_correct >= 10,
            Badge::Centurion => stats.points >= 1000,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown badge '{}'", s))
    }
}

/// Counters a user's badges are computed from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamificationStats {
    pub points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<NaiveDate>,
    pub items_completed: i64,
    pub quiz_correct: i64,
}

impl GamificationStats {
    /// Apply one activity on `today`, returning the points it earned.
    ///
    /// `award_points` is false for repeats that only count toward the streak.
    pub fn apply(&mut self, activity: Activity, today: NaiveDate, award_points: bool) -> i64 {
        self.current_streak = advance_streak(self.last_activity_date, today, self.current_streak);
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(today);

        if !award_points {
            return 0;
        }

        match activity {
            Activity::ItemCompleted => self.items_completed += 1,
            Activity::QuizCorrect => self.quiz_correct += 1,
            _ => {}
        }

        let earned = activity.points();
        self.points += earned;
        earned
    }

    pub fn level(&self) -> i64 {
        level_for_points(self.points)
    }

    /// Every badge these counters qualify for
    pub fn earned_badges(&self) -> Vec<Badge> {
        Badge::ALL
            .iter()
            .copied()
            .filter(|b| b.earned_by(self))
            .collect()
    }
}
