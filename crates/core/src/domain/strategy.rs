use crate::domain::activity::ActivitySnapshot;
use crate::domain::weights::WeightParameter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inputs of one generation run, copied at the moment of the request so the
/// run stays reproducible even while weights or activities change underneath.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub id: Uuid,
    pub requested_by: String,
    pub weights: Vec<WeightParameter>,
    pub activities: Vec<ActivitySnapshot>,
    pub created_at: DateTime<Utc>,
}

impl RecommendationRequest {
    pub fn new(
        requested_by: &str,
        weights: Vec<WeightParameter>,
        activities: Vec<ActivitySnapshot>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requested_by: requested_by.to_string(),
            weights,
            activities,
            created_at: Utc::now(),
        }
    }
}

/// A parsed strategy before it gets an id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDraft {
    pub name: String,
    pub description: String,
    pub advantages: Vec<String>,
    pub disadvantages: Vec<String>,
    pub steps: Vec<String>,
    pub is_recommended: bool,
    pub score: f64,
}

/// Stored strategy record. Immutable except for the one apply transition
/// (`Generated -> Applied`, terminal).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Strategy {
    pub id: Uuid,
    pub source_request_id: Uuid,
    pub name: String,
    pub description: String,
    pub advantages: Vec<String>,
    pub disadvantages: Vec<String>,
    pub steps: Vec<String>,
    pub is_recommended: bool,
    pub score: f64,
    pub applied_at: Option<DateTime<Utc>>,
    pub applied_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
