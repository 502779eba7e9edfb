use crate::domain::profile::{ChatMessage, UserAnswers};
use anyhow::Context;

/// Start a session row for a new conversation. `last_request_id` records the
/// turn currently in flight so stale responses can be detected.
pub async fn create_session(
    pool: &sqlx::PgPool,
    request_id: Option<&str>,
    history: &[ChatMessage],
    answers: &UserAnswers,
    is_complete: bool,
) -> anyhow::Result<uuid::Uuid> {
    let session_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO chat_sessions (chat_history, current_answers, is_complete, last_request_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(serde_json::to_value(history).context("serialize chat history failed")?)
    .bind(serde_json::to_value(answers).context("serialize answers failed")?)
    .bind(is_complete)
    .bind(request_id)
    .fetch_one(pool)
    .await
    .context("insert chat_sessions failed")?;

    Ok(session_id)
}

/// Record that a new request now owns the session turn. Any response still
/// in flight for an earlier request id will fail its `commit_turn`.
pub async fn begin_turn(
    pool: &sqlx::PgPool,
    session_id: uuid::Uuid,
    request_id: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE chat_sessions SET last_request_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(session_id)
    .bind(request_id)
    .execute(pool)
    .await
    .context("begin chat turn failed")?;

    Ok(())
}

/// Commit a turn's outcome only if no newer request superseded it. Returns
/// false when the write was fenced out.
pub async fn commit_turn(
    pool: &sqlx::PgPool,
    session_id: uuid::Uuid,
    request_id: &str,
    history: &[ChatMessage],
    answers: &UserAnswers,
    is_complete: bool,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE chat_sessions \
         SET chat_history = $3, current_answers = $4, is_complete = $5, updated_at = NOW() \
         WHERE id = $1 AND last_request_id = $2",
    )
    .bind(session_id)
    .bind(request_id)
    .bind(serde_json::to_value(history).context("serialize chat history failed")?)
    .bind(serde_json::to_value(answers).context("serialize answers failed")?)
    .bind(is_complete)
    .execute(pool)
    .await
    .context("commit chat turn failed")?;

    Ok(result.rows_affected() > 0)
}

/// Attach a saved profile to the session that produced it.
pub async fn link_profile(
    pool: &sqlx::PgPool,
    session_id: uuid::Uuid,
    profile_id: uuid::Uuid,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE chat_sessions SET user_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(session_id)
        .bind(profile_id)
        .execute(pool)
        .await
        .context("link profile to chat session failed")?;

    Ok(())
}
