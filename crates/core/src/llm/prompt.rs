use crate::domain::activity::ActivitySnapshot;
use crate::domain::weights::WeightParameter;
use crate::error::GenerationError;
use serde_json::json;

/// Builds the user prompt for one generation run. Deterministic: identical
/// weights and activities produce byte-identical text (stable input order,
/// no timestamps, no randomness), which keeps runs debuggable and the
/// builder testable.
pub fn build(
    weights: &[WeightParameter],
    activities: &[ActivitySnapshot],
) -> anyhow::Result<String> {
    if activities.is_empty() {
        return Err(GenerationError::EmptyInput.into());
    }

    let weights_json: Vec<_> = weights
        .iter()
        .map(|w| {
            json!({
                "key": w.key,
                "label": w.label,
                "value": w.value,
            })
        })
        .collect();

    let activities_json: Vec<_> = activities
        .iter()
        .map(|a| {
            json!({
                "platform": a.platform,
                "discount": a.discount,
                "commission": a.commission,
                "starts_on": a.starts_on.to_string(),
                "ends_on": a.ends_on.to_string(),
                "status": a.status.as_str(),
                "room_types": a.room_types,
            })
        })
        .collect();

    let instructions = [
        "You advise a hotel chain on which OTA promotional activities to join.",
        "Weigh the activities using the priority weights below (0 = ignore, 10 = dominant).",
        "Return ONLY a valid JSON array of 2 to 3 strategy objects. No markdown, no prose.",
        "Each object must use exactly these keys:",
        "{",
        "  \"name\": \"short strategy name\",",
        "  \"description\": \"what to do and why\",",
        "  \"advantages\": [\"...\"],",
        "  \"disadvantages\": [\"...\"],",
        "  \"steps\": [\"...\"],",
        "  \"is_recommended\": false,",
        "  \"score\": 0.0",
        "}",
        "Rules:",
        "- exactly one object has is_recommended=true",
        "- score is 0..100, higher is better under the given weights",
        "- every strategy must reference the activities by platform name",
        "- advantages, disadvantages and steps are short bullet strings",
    ]
    .join("\n");

    Ok(format!(
        "{instructions}\n\nPriority weights JSON:\n{}\n\nActivities JSON:\n{}",
        serde_json::to_string(&weights_json)?,
        serde_json::to_string(&activities_json)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::activity::ActivityStatus;
    use chrono::NaiveDate;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample_weights() -> Vec<WeightParameter> {
        let updated_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        [
            ("future_booking", "Future bookings", 7),
            ("cost", "Cost control", 6),
            ("visibility", "Platform visibility", 8),
            ("occupancy", "Occupancy", 5),
            ("balance", "Channel balance", 6),
        ]
        .into_iter()
        .map(|(key, label, value)| WeightParameter {
            key: key.to_string(),
            label: label.to_string(),
            description: String::new(),
            value,
            updated_at,
        })
        .collect()
    }

    fn sample_activity() -> ActivitySnapshot {
        ActivitySnapshot {
            id: Uuid::nil(),
            platform: "携程".to_string(),
            discount: "8.5折".to_string(),
            commission: "8%".to_string(),
            starts_on: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            status: ActivityStatus::Active,
            room_types: vec!["standard".to_string(), "suite".to_string()],
        }
    }

    #[test]
    fn identical_inputs_build_identical_prompts() {
        let weights = sample_weights();
        let activities = vec![sample_activity()];
        let a = build(&weights, &activities).unwrap();
        let b = build(&weights, &activities).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_encodes_every_weight_and_activity_field() {
        let weights = sample_weights();
        let activities = vec![sample_activity()];
        let prompt = build(&weights, &activities).unwrap();

        for w in &weights {
            assert!(prompt.contains(&w.key), "missing weight key {}", w.key);
            assert!(prompt.contains(&w.label), "missing label {}", w.label);
            assert!(
                prompt.contains(&format!("\"value\":{}", w.value)),
                "missing value for {}",
                w.key
            );
        }

        assert!(prompt.contains("携程"));
        assert!(prompt.contains("8.5折"));
        assert!(prompt.contains("8%"));
        assert!(prompt.contains("2026-03-01"));
        assert!(prompt.contains("2026-03-31"));
        assert!(prompt.contains("active"));
        assert!(prompt.contains("suite"));
    }

    #[test]
    fn empty_activity_set_is_rejected() {
        let err = build(&sample_weights(), &[]).unwrap_err();
        let gen = err.downcast_ref::<crate::error::GenerationError>().unwrap();
        assert!(matches!(gen, crate::error::GenerationError::EmptyInput));
    }
}
