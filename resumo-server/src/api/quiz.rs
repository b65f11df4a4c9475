//! Quiz endpoints

use axum::{
    extract::State,
    Extension, Json,
};
use resumo_common::gamification::Activity;
use resumo_common::time;
use resumo_common::validation::FieldErrors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::api::access::{load_item, require_access};
use crate::api::gamification::ActivityOutcomeView;
use crate::db;
use crate::db::gamification::ActivityOutcome;
use crate::extract::{ApiJson, ApiPath};
use crate::error::{ApiError, ApiResult};
use crate::session::SessionUser;
use crate::AppState;

/// Question as shown to readers (no answer key)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub position: i64,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub item_id: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    pub question_id: String,
    pub selected_index: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub question_id: String,
    pub selected_index: i64,
    pub correct: bool,
    pub correct_index: i64,
    pub explanation: Option<String>,
    pub points_awarded: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswersResponse {
    pub score: i64,
    pub total: i64,
    pub results: Vec<AnswerResult>,
    pub gamification: Option<ActivityOutcomeView>,
}

/// GET /api/quiz/:item_id
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(item_id): ApiPath<String>,
) -> ApiResult<Json<QuizResponse>> {
    let item = load_item(&state, &item_id).await?;
    require_access(&state, &session.user, &item).await?;

    let questions = db::quiz::questions_for_item(&state.db, &item.guid)
        .await?
        .into_iter()
        .map(|q| QuestionView {
            id: q.guid,
            position: q.position,
            prompt: q.prompt,
            options: q.options.0,
        })
        .collect();

    Ok(Json(QuizResponse {
        item_id: item.guid,
        questions,
    }))
}

/// POST /api/quiz/:item_id/answers
///
/// All answers are validated before any is recorded. A question earns
/// points only the first time it is answered correctly.
pub async fn submit_answers(
    State(state): State<AppState>,
    Extension(session): Extension<SessionUser>,
    ApiPath(item_id): ApiPath<String>,
    ApiJson(request): ApiJson<SubmitAnswersRequest>,
) -> ApiResult<Json<SubmitAnswersResponse>> {
    let item = load_item(&state, &item_id).await?;
    require_access(&state, &session.user, &item).await?;

    if request.answers.is_empty() {
        return Err(ApiError::BadRequest("answers must not be empty".to_string()));
    }

    let questions: HashMap<String, _> = db::quiz::questions_for_item(&state.db, &item.guid)
        .await?
        .into_iter()
        .map(|q| (q.guid.clone(), q))
        .collect();

    let mut errors = FieldErrors::new();
    for (index, answer) in request.answers.iter().enumerate() {
        let field = format!("answers[{}]", index);
        match questions.get(&answer.question_id) {
            None => errors.add(&field, "unknown question for this item"),
            Some(question) => errors.check(
                answer.selected_index >= 0 && (answer.selected_index as usize) < question.options.0.len(),
                &field,
                format!("selectedIndex must be between 0 and {}", question.options.0.len().saturating_sub(1)),
            ),
        }
    }
    errors.into_result()?;

    let user_id = &session.user.guid;
    let today = time::today();
    let mut tx = state.db.begin().await?;
    let mut results = Vec::with_capacity(request.answers.len());
    let mut score = 0;
    let mut combined: Option<ActivityOutcome> = None;

    for answer in &request.answers {
        let Some(question) = questions.get(&answer.question_id) else {
            continue;
        };
        let correct = answer.selected_index == question.correct_index;
        let first_correct =
            correct && !db::quiz::has_correct_answer(&mut tx, user_id, &question.guid).await?;

        db::quiz::insert_answer(&mut tx, user_id, &question.guid, answer.selected_index, correct)
            .await?;

        let mut points_awarded = 0;
        if correct {
            score += 1;
            let outcome = db::gamification::record_activity(
                &mut tx,
                user_id,
                Activity::QuizCorrect,
                today,
                first_correct,
            )
            .await?;
            points_awarded = outcome.points_awarded;
            match combined.as_mut() {
                Some(total) => ActivityOutcome::merge(total, outcome),
                None => combined = Some(outcome),
            }
        }

        results.push(AnswerResult {
            question_id: question.guid.clone(),
            selected_index: answer.selected_index,
            correct,
            correct_index: question.correct_index,
            explanation: question.explanation.clone(),
            points_awarded,
        });
    }

    tx.commit().await?;
    debug!("User {} scored {}/{} on {}", user_id, score, results.len(), item.slug);

    Ok(Json(SubmitAnswersResponse {
        score,
        total: results.len() as i64,
        results,
        gamification: combined.map(ActivityOutcomeView::from),
    }))
}
