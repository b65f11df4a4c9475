//! Access check endpoint and the gate shared by content endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use resumo_common::access::{remaining_free_items, AccessDecision, DenialReason, GrantReason};
use resumo_common::db::{Item, User};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db;
use crate::extract::ApiQuery;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessQuery {
    pub item_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub allowed: bool,
    pub reason: GrantReason,
    pub remaining_free_items: i64,
}

fn denial_error(reason: DenialReason) -> ApiError {
    match reason {
        DenialReason::Unpublished => ApiError::Forbidden("Item is not available".to_string()),
        DenialReason::FreeLimitReached { limit } => ApiError::PaymentRequired(format!(
            "Free plan limit of {} items reached; subscribe to keep reading",
            limit
        )),
    }
}

/// Load a published item by id, or 404
pub async fn load_item(state: &AppState, item_id: &str) -> ApiResult<Item> {
    db::items::find_by_id(&state.db, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {}", item_id)))
}

/// Gate a content read.
///
/// Denials become 402/403 errors; a grant through the free quota is
/// claimed in the unlock ledger, and a lost race for the last free slot
/// is a 402 as well.
pub async fn require_access(state: &AppState, user: &User, item: &Item) -> ApiResult<GrantReason> {
    let (decision, facts) = db::access::evaluate(&state.db, user, item).await?;
    match decision {
        AccessDecision::Granted(reason) => {
            if decision.consumes_quota() {
                let claimed =
                    db::access::claim_unlock(&state.db, &user.guid, &item.guid, facts.free_limit).await?;
                if !claimed {
                    return Err(denial_error(DenialReason::FreeLimitReached {
                        limit: facts.free_limit,
                    }));
                }
                debug!("User {} unlocked item {} with free quota", user.guid, item.guid);
            }
            Ok(reason)
        }
        AccessDecision::Denied(reason) => Err(denial_error(reason)),
    }
}

/// GET /api/access/check?itemId=
///
/// Reports the decision without consuming quota.
pub async fn check_access(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiQuery(query): ApiQuery<AccessQuery>,
) -> ApiResult<Json<AccessResponse>> {
    let item_id = query
        .item_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("itemId is required".to_string()))?;

    let item = load_item(&state, &item_id).await?;
    let (decision, facts) = db::access::evaluate(&state.db, &session.user, &item).await?;

    match decision {
        AccessDecision::Granted(reason) => Ok(Json(AccessResponse {
            allowed: true,
            reason,
            remaining_free_items: remaining_free_items(&facts, &decision),
        })),
        AccessDecision::Denied(reason) => Err(denial_error(reason)),
    }
}
