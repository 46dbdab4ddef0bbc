use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use promodesk_core::config::Settings;
use promodesk_core::domain::strategy::Strategy;
use promodesk_core::domain::weights::WeightParameter;
use promodesk_core::error::GenerationError;
use promodesk_core::llm::deepseek::DeepSeekClient;
use promodesk_core::pipeline;
use promodesk_core::storage;
use promodesk_core::storage::strategies::ApplyOutcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match prepare_db(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db setup failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let state = AppState { pool, settings };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/weights", get(list_weights))
        .route("/weights/:key", put(update_weight))
        .route("/recommendations", get(list_recommendations))
        .route("/recommendations/generate", post(generate_recommendations))
        .route("/recommendations/:id", get(get_recommendation))
        .route("/recommendations/:id/apply", post(apply_recommendation))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn prepare_db(pool: &PgPool) -> anyhow::Result<()> {
    storage::migrate(pool).await?;
    storage::weights::seed_defaults(pool).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    pool: Option<PgPool>,
    settings: Settings,
}

/// Maps pipeline failures onto HTTP statuses. Anything that does not carry a
/// `GenerationError` is an internal fault and goes to Sentry.
fn error_status(err: anyhow::Error) -> StatusCode {
    match err.downcast_ref::<GenerationError>() {
        Some(GenerationError::Validation { .. }) => StatusCode::BAD_REQUEST,
        Some(GenerationError::Authentication { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(GenerationError::Timeout { .. }) | Some(GenerationError::Upstream { .. }) => {
            tracing::warn!(error = %err, "model call failed");
            StatusCode::BAD_GATEWAY
        }
        Some(GenerationError::Unparsable { raw_output, .. }) => {
            // Raw output is kept in the log line for diagnosis.
            tracing::warn!(error = %err, raw_output = %raw_output, "model output unparsable");
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Some(GenerationError::EmptyInput) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(GenerationError::Busy { .. }) => StatusCode::CONFLICT,
        None => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "internal error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn list_weights(
    State(state): State<AppState>,
) -> Result<Json<Vec<WeightParameter>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let weights = storage::weights::get_all(pool).await.map_err(error_status)?;
    Ok(Json(weights))
}

#[derive(Debug, Deserialize)]
struct UpdateWeightBody {
    value: i32,
}

async fn update_weight(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<UpdateWeightBody>,
) -> Result<Json<WeightParameter>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let updated = storage::weights::update(pool, &key, body.value)
        .await
        .map_err(error_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(updated))
}

/// Summary view for listings; the full record is behind the id route.
#[derive(Debug, Serialize)]
struct StrategySummary {
    id: Uuid,
    name: String,
    is_recommended: bool,
    score: f64,
    applied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<Strategy> for StrategySummary {
    fn from(s: Strategy) -> Self {
        Self {
            id: s.id,
            name: s.name,
            is_recommended: s.is_recommended,
            score: s.score,
            applied_at: s.applied_at,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

async fn list_recommendations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<StrategySummary>>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let strategies = storage::strategies::list_recent(pool, limit)
        .await
        .map_err(error_status)?;

    Ok(Json(strategies.into_iter().map(Into::into).collect()))
}

async fn get_recommendation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Strategy>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let strategy = storage::strategies::get(pool, id)
        .await
        .map_err(error_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(strategy))
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    requested_by: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    request_id: Uuid,
    strategies: Vec<Strategy>,
}

async fn generate_recommendations(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let requested_by = body.requested_by.trim();
    if requested_by.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Credential is checked up front: a missing key is a 503 before any work.
    let llm = DeepSeekClient::from_settings(&state.settings).map_err(error_status)?;

    let outcome = pipeline::generate(pool, &llm, requested_by)
        .await
        .map_err(error_status)?;

    Ok(Json(GenerateResponse {
        request_id: outcome.request_id,
        strategies: outcome.strategies,
    }))
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    applied_by: String,
}

async fn apply_recommendation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApplyBody>,
) -> Result<Json<Strategy>, StatusCode> {
    let Some(pool) = &state.pool else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let applied_by = body.applied_by.trim();
    if applied_by.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match storage::strategies::apply(pool, id, applied_by)
        .await
        .map_err(error_status)?
    {
        ApplyOutcome::Applied(strategy) => Ok(Json(strategy)),
        ApplyOutcome::NotFound => Err(StatusCode::NOT_FOUND),
        ApplyOutcome::AlreadyApplied => Err(StatusCode::CONFLICT),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
