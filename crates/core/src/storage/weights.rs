use crate::domain::weights::{self, WeightParameter};
use anyhow::Context;

/// Idempotent first-run seeding of the five default parameters.
pub async fn seed_defaults(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (sort_order, (key, label, description)) in weights::DEFAULT_WEIGHTS.iter().enumerate() {
        sqlx::query(
            "INSERT INTO weight_parameters (key, label, description, value, sort_order, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(label)
        .bind(description)
        .bind(weights::DEFAULT_WEIGHT_VALUE)
        .bind(sort_order as i32)
        .execute(pool)
        .await
        .with_context(|| format!("seed weight_parameters failed (key={key})"))?;
    }
    Ok(())
}

pub async fn get_all(pool: &sqlx::PgPool) -> anyhow::Result<Vec<WeightParameter>> {
    let rows = sqlx::query_as::<_, WeightParameter>(
        "SELECT key, label, description, value, updated_at \
         FROM weight_parameters \
         ORDER BY sort_order ASC, key ASC",
    )
    .fetch_all(pool)
    .await
    .context("select weight_parameters failed")?;
    Ok(rows)
}

/// Last-writer-wins update of one parameter. `None` means the key is
/// unknown. Out-of-range values are rejected before touching the row, so a
/// failed update leaves the stored value untouched.
pub async fn update(
    pool: &sqlx::PgPool,
    key: &str,
    value: i32,
) -> anyhow::Result<Option<WeightParameter>> {
    weights::validate_weight_value(value)?;

    let row = sqlx::query_as::<_, WeightParameter>(
        "UPDATE weight_parameters \
         SET value = $2, updated_at = now() \
         WHERE key = $1 \
         RETURNING key, label, description, value, updated_at",
    )
    .bind(key)
    .bind(value)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("update weight_parameters failed (key={key})"))?;

    Ok(row)
}
