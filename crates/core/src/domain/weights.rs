use crate::error::GenerationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WEIGHT_MIN: i32 = 0;
pub const WEIGHT_MAX: i32 = 10;

/// One of the five strategy-bias parameters. Seeded at first run, mutated
/// only via the update operation, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeightParameter {
    pub key: String,
    pub label: String,
    pub description: String,
    pub value: i32,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_weight_value(value: i32) -> anyhow::Result<()> {
    if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&value) {
        return Err(GenerationError::Validation {
            detail: format!("weight value must be {WEIGHT_MIN}..={WEIGHT_MAX} (got {value})"),
        }
        .into());
    }
    Ok(())
}

/// (key, label, description) of the seeded defaults, in display order.
/// All default to value 5.
pub const DEFAULT_WEIGHTS: [(&str, &str, &str); 5] = [
    (
        "future_booking",
        "Future bookings",
        "Prefer activities likely to fill the future booking window",
    ),
    (
        "cost",
        "Cost control",
        "Penalize high commission rates and deep discounts",
    ),
    (
        "visibility",
        "Platform visibility",
        "Prefer activities that boost listing exposure on the OTA platform",
    ),
    (
        "occupancy",
        "Occupancy",
        "Prefer activities expected to lift short-term occupancy",
    ),
    (
        "balance",
        "Channel balance",
        "Prefer an even spread of participation across platforms",
    ),
];

pub const DEFAULT_WEIGHT_VALUE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_range() {
        for v in WEIGHT_MIN..=WEIGHT_MAX {
            assert!(validate_weight_value(v).is_ok(), "value {v} should pass");
        }
    }

    #[test]
    fn rejects_out_of_range() {
        for v in [-1, 11, 100, i32::MIN, i32::MAX] {
            let err = validate_weight_value(v).unwrap_err();
            let gen = err.downcast_ref::<GenerationError>().unwrap();
            assert!(matches!(gen, GenerationError::Validation { .. }));
        }
    }

    #[test]
    fn default_keys_are_unique() {
        let mut keys: Vec<_> = DEFAULT_WEIGHTS.iter().map(|(k, _, _)| *k).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), DEFAULT_WEIGHTS.len());
    }
}
