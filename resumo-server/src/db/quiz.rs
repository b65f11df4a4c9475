//! Quiz questions and answers

use resumo_common::db::QuizQuestion;
use resumo_common::{time, uuid_utils, Result};
use sqlx::{SqliteConnection, SqlitePool};

/// Questions ordered by position
pub async fn questions_for_item(pool: &SqlitePool, item_id: &str) -> Result<Vec<QuizQuestion>> {
    let questions = sqlx::query_as::<_, QuizQuestion>(
        "SELECT * FROM quiz_questions WHERE item_id = ? ORDER BY position",
    )
    .bind(item_id)
    .fetch_all(pool)
    .await?;
    Ok(questions)
}

pub async fn has_correct_answer(
    conn: &mut SqliteConnection,
    user_id: &str,
    question_id: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM quiz_answers WHERE user_id = ? AND question_id = ? AND is_correct = 1)",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

pub async fn insert_answer(
    conn: &mut SqliteConnection,
    user_id: &str,
    question_id: &str,
    selected_index: i64,
    is_correct: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO quiz_answers (guid, user_id, question_id, selected_index, is_correct, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate())
    .bind(user_id)
    .bind(question_id)
    .bind(selected_index)
    .bind(is_correct)
    .bind(time::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
