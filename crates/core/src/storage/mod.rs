use anyhow::Context;

pub mod activities;
pub mod lock;
pub mod strategies;
pub mod weights;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
