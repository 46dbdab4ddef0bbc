use crate::domain::activity::ActivityStatus;
use crate::domain::strategy::{RecommendationRequest, Strategy};
use crate::error::GenerationError;
use crate::llm::{parse, prompt, LlmClient};
use crate::storage;

/// Activities worth ranking: ended and undecided ones carry no decision.
const RANKABLE_STATUSES: [ActivityStatus; 2] = [ActivityStatus::Upcoming, ActivityStatus::Active];

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request_id: uuid::Uuid,
    pub strategies: Vec<Strategy>,
}

/// Runs one generation end to end: snapshot inputs, build the prompt, call
/// the model, parse, persist. The whole run works on owned copies of the
/// weights and activities, so concurrent runs share no mutable state; the
/// advisory lock only stops the same session from generating twice at once.
pub async fn generate(
    pool: &sqlx::PgPool,
    llm: &dyn LlmClient,
    requested_by: &str,
) -> anyhow::Result<GenerationOutcome> {
    let Some(lock) = storage::lock::try_acquire_session_lock(pool, requested_by).await? else {
        return Err(GenerationError::Busy {
            requested_by: requested_by.to_string(),
        }
        .into());
    };

    let result = generate_locked(pool, llm, requested_by).await;
    if let Err(err) = lock.release().await {
        tracing::warn!(requested_by, error = %err, "failed to release session lock");
    }
    result
}

async fn generate_locked(
    pool: &sqlx::PgPool,
    llm: &dyn LlmClient,
    requested_by: &str,
) -> anyhow::Result<GenerationOutcome> {
    let weights = storage::weights::get_all(pool).await?;
    let activities = storage::activities::current(pool, &RANKABLE_STATUSES).await?;

    let prompt_text = prompt::build(&weights, &activities)?;
    tracing::debug!(
        requested_by,
        model = llm.model().model_id(),
        weights_len = weights.len(),
        activities_len = activities.len(),
        prompt_len = prompt_text.len(),
        "generation prompt built"
    );

    let (reply, raw_response) = llm.complete(&prompt_text).await?;
    let drafts = parse::parse(&reply)?;

    let request = RecommendationRequest::new(requested_by, weights, activities);
    let strategies = storage::strategies::persist(pool, &request, &drafts, Some(raw_response))
        .await?;

    tracing::info!(
        requested_by,
        request_id = %request.id,
        strategies_len = strategies.len(),
        "persisted strategy batch"
    );

    Ok(GenerationOutcome {
        request_id: request.id,
        strategies,
    })
}
