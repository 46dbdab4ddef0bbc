use crate::domain::activity::{ActivitySnapshot, ActivityStatus};
use anyhow::Context;
use chrono::NaiveDate;
use uuid::Uuid;

/// Point-in-time copy of the activities in the given statuses. The returned
/// rows are owned; later mutation of `promo_activities` by other requests
/// cannot change a snapshot already handed to the prompt builder.
pub async fn current(
    pool: &sqlx::PgPool,
    statuses: &[ActivityStatus],
) -> anyhow::Result<Vec<ActivitySnapshot>> {
    let status_strs: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

    let rows = sqlx::query_as::<
        _,
        (
            Uuid,
            String,
            String,
            String,
            NaiveDate,
            NaiveDate,
            String,
            Vec<String>,
        ),
    >(
        "SELECT id, platform, discount, commission, starts_on, ends_on, status, room_types \
         FROM promo_activities \
         WHERE status = ANY($1) \
         ORDER BY starts_on ASC, id ASC",
    )
    .bind(&status_strs)
    .fetch_all(pool)
    .await
    .context("select promo_activities failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, platform, discount, commission, starts_on, ends_on, status, room_types) in rows {
        out.push(ActivitySnapshot {
            id,
            platform,
            discount,
            commission,
            starts_on,
            ends_on,
            status: ActivityStatus::parse(&status)
                .with_context(|| format!("invalid status in DB for activity {id}"))?,
            room_types,
        });
    }
    Ok(out)
}
