use crate::domain::strategy::{RecommendationRequest, Strategy, StrategyDraft};
use anyhow::Context;
use uuid::Uuid;

const STRATEGY_COLUMNS: &str = "id, source_request_id, name, description, advantages, \
     disadvantages, steps, is_recommended, score, applied_at, applied_by, created_at";

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Applied(Strategy),
    NotFound,
    AlreadyApplied,
}

/// Persists one generation run: the immutable request snapshot plus its
/// strategies, in a single transaction. Inserts only; a failed or repeated
/// generation can never clobber earlier batches.
pub async fn persist(
    pool: &sqlx::PgPool,
    request: &RecommendationRequest,
    drafts: &[StrategyDraft],
    raw_response: Option<serde_json::Value>,
) -> anyhow::Result<Vec<Strategy>> {
    anyhow::ensure!(!drafts.is_empty(), "drafts must be non-empty");

    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query(
        "INSERT INTO recommendation_requests (id, requested_by, weights, activities, raw_response, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(request.id)
    .bind(&request.requested_by)
    .bind(serde_json::to_value(&request.weights).context("serialize weights failed")?)
    .bind(serde_json::to_value(&request.activities).context("serialize activities failed")?)
    .bind(raw_response)
    .bind(request.created_at)
    .execute(&mut *tx)
    .await
    .context("insert recommendation_requests failed")?;

    let mut stored = Vec::with_capacity(drafts.len());
    for (position, draft) in drafts.iter().enumerate() {
        let row = sqlx::query_as::<_, Strategy>(&format!(
            "INSERT INTO strategies \
               (id, source_request_id, position, name, description, advantages, disadvantages, \
                steps, is_recommended, score, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {STRATEGY_COLUMNS}",
        ))
        .bind(Uuid::new_v4())
        .bind(request.id)
        .bind(position as i32)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.advantages)
        .bind(&draft.disadvantages)
        .bind(&draft.steps)
        .bind(draft.is_recommended)
        .bind(draft.score)
        .bind(request.created_at)
        .fetch_one(&mut *tx)
        .await
        .context("insert strategies failed")?;
        stored.push(row);
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(stored)
}

pub async fn get(pool: &sqlx::PgPool, id: Uuid) -> anyhow::Result<Option<Strategy>> {
    let row = sqlx::query_as::<_, Strategy>(&format!(
        "SELECT {STRATEGY_COLUMNS} FROM strategies WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("select strategy failed")?;
    Ok(row)
}

pub async fn list_recent(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<Vec<Strategy>> {
    let rows = sqlx::query_as::<_, Strategy>(&format!(
        "SELECT {STRATEGY_COLUMNS} FROM strategies \
         ORDER BY created_at DESC, position ASC \
         LIMIT $1",
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("list strategies failed")?;
    Ok(rows)
}

/// The only mutation path. A second apply is rejected, not absorbed, so
/// "who applied this and when" stays auditable.
pub async fn apply(
    pool: &sqlx::PgPool,
    id: Uuid,
    applied_by: &str,
) -> anyhow::Result<ApplyOutcome> {
    let row = sqlx::query_as::<_, Strategy>(&format!(
        "UPDATE strategies \
         SET applied_at = now(), applied_by = $2 \
         WHERE id = $1 AND applied_at IS NULL \
         RETURNING {STRATEGY_COLUMNS}",
    ))
    .bind(id)
    .bind(applied_by)
    .fetch_optional(pool)
    .await
    .context("apply strategy failed")?;

    if let Some(strategy) = row {
        return Ok(ApplyOutcome::Applied(strategy));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM strategies WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("strategy existence probe failed")?;

    Ok(if exists.is_some() {
        ApplyOutcome::AlreadyApplied
    } else {
        ApplyOutcome::NotFound
    })
}
