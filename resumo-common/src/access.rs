//! Content access decisions
//!
//! The decision is a pure function of facts the server loads from the
//! database, so every gate (access check, content, quiz, sync map, media)
//! answers the same way.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{SubscriptionPlan, UserRole};

/// Everything needed to decide whether a user may read an item
#[derive(Debug, Clone)]
pub struct AccessFacts {
    pub role: UserRole,
    pub plan: SubscriptionPlan,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub item_is_free: bool,
    pub item_published: bool,
    /// Item is already in the user's free-tier unlock ledger
    pub already_unlocked: bool,
    /// Number of items in the user's unlock ledger
    pub unlocked_count: i64,
    /// `free_items_limit` setting
    pub free_limit: i64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantReason {
    Admin,
    FreeItem,
    Subscription,
    AlreadyUnlocked,
    FreeQuota,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Item is not published (403)
    Unpublished,
    /// Free-tier quota exhausted (402)
    FreeLimitReached { limit: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted(GrantReason),
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted(_))
    }

    /// Granting through the free quota must be recorded in the unlock ledger
    pub fn consumes_quota(&self) -> bool {
        matches!(self, AccessDecision::Granted(GrantReason::FreeQuota))
    }
}

/// True if the plan is premium and not expired
pub fn subscription_active(
    plan: SubscriptionPlan,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match plan {
        SubscriptionPlan::Free => false,
        SubscriptionPlan::Premium => expires_at.map_or(true, |at| at > now),
    }
}

/// Decide access. Rules are evaluated in order; the first match wins.
pub fn decide(facts: &AccessFacts) -> AccessDecision {
    if facts.role == UserRole::Admin {
        return AccessDecision::Granted(GrantReason::Admin);
    }
    if !facts.item_published {
        return AccessDecision::Denied(DenialReason::Unpublished);
    }
    if facts.item_is_free {
        return AccessDecision::Granted(GrantReason::FreeItem);
    }
    if subscription_active(facts.plan, facts.subscription_expires_at, facts.now) {
        return AccessDecision::Granted(GrantReason::Subscription);
    }
    if facts.already_unlocked {
        return AccessDecision::Granted(GrantReason::AlreadyUnlocked);
    }
    if facts.unlocked_count < facts.free_limit {
        return AccessDecision::Granted(GrantReason::FreeQuota);
    }
    AccessDecision::Denied(DenialReason::FreeLimitReached {
        limit: facts.free_limit,
    })
}

/// Free items still available after this decision is applied
pub fn remaining_free_items(facts: &AccessFacts, decision: &AccessDecision) -> i64 {
    let used = facts.unlocked_count + if decision.consumes_quota() { 1 } else { 0 };
    (facts.free_limit - used).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reader_facts() -> AccessFacts {
        AccessFacts {
            role: UserRole::Reader,
            plan: SubscriptionPlan::Free,
            subscription_expires_at: None,
            item_is_free: false,
            item_published: true,
            already_unlocked: false,
            unlocked_count: 0,
            free_limit: 3,
            now: Utc::now(),
        }
    }

    #[test]
    fn test_admin_reads_anything() {
        let facts = AccessFacts {
            role: UserRole::Admin,
            item_published: false,
            unlocked_count: 99,
            ..reader_facts()
        };
        assert_eq!(decide(&facts), AccessDecision::Granted(GrantReason::Admin));
    }

    #[test]
    fn test_unpublished_is_forbidden_even_for_subscribers() {
        let facts = AccessFacts {
            plan: SubscriptionPlan::Premium,
            item_published: false,
            ..reader_facts()
        };
        assert_eq!(decide(&facts), AccessDecision::Denied(DenialReason::Unpublished));
    }

    #[test]
    fn test_free_item_does_not_consume_quota() {
        let facts = AccessFacts {
            item_is_free: true,
            unlocked_count: 3,
            ..reader_facts()
        };
        let decision = decide(&facts);
        assert_eq!(decision, AccessDecision::Granted(GrantReason::FreeItem));
        assert!(!decision.consumes_quota());
    }

    #[test]
    fn test_active_subscription() {
        let now = Utc::now();
        let facts = AccessFacts {
            plan: SubscriptionPlan::Premium,
            subscription_expires_at: Some(now + Duration::days(3)),
            unlocked_count: 3,
            now,
            ..reader_facts()
        };
        assert_eq!(decide(&facts), AccessDecision::Granted(GrantReason::Subscription));
    }

    #[test]
    fn test_expired_subscription_falls_back_to_quota() {
        let now = Utc::now();
        let facts = AccessFacts {
            plan: SubscriptionPlan::Premium,
            subscription_expires_at: Some(now - Duration::seconds(1)),
            unlocked_count: 3,
            now,
            ..reader_facts()
        };
        assert_eq!(
            decide(&facts),
            AccessDecision::Denied(DenialReason::FreeLimitReached { limit: 3 })
        );
    }

    #[test]
    fn test_premium_without_expiry_is_active() {
        assert!(subscription_active(SubscriptionPlan::Premium, None, Utc::now()));
        assert!(!subscription_active(SubscriptionPlan::Free, None, Utc::now()));
    }

    #[test]
    fn test_already_unlocked_survives_exhausted_quota() {
        let facts = AccessFacts {
            already_unlocked: true,
            unlocked_count: 3,
            ..reader_facts()
        };
        assert_eq!(decide(&facts), AccessDecision::Granted(GrantReason::AlreadyUnlocked));
    }

    #[test]
    fn test_quota_boundary() {
        let facts = AccessFacts {
            unlocked_count: 2,
            ..reader_facts()
        };
        let decision = decide(&facts);
        assert_eq!(decision, AccessDecision::Granted(GrantReason::FreeQuota));
        assert!(decision.consumes_quota());
        assert_eq!(remaining_free_items(&facts, &decision), 0);

        let facts = AccessFacts {
            unlocked_count: 3,
            ..reader_facts()
        };
        let decision = decide(&facts);
        assert!(!decision.is_granted());
        assert_eq!(remaining_free_items(&facts, &decision), 0);
    }

    #[test]
    fn test_zero_limit_denies_everything_paid() {
        let facts = AccessFacts {
            free_limit: 0,
            ..reader_facts()
        };
        assert_eq!(
            decide(&facts),
            AccessDecision::Denied(DenialReason::FreeLimitReached { limit: 0 })
        );
    }
}
