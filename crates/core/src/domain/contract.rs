use crate::domain::strategy::StrategyDraft;
use anyhow::bail;
use serde::{Deserialize, Serialize};

pub const MIN_STRATEGIES: usize = 2;
pub const MAX_STRATEGIES: usize = 3;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Lenient shape of one strategy as the model emits it. Everything beyond
/// name and description is optional; list sections default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmStrategy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub advantages: Vec<String>,
    #[serde(default)]
    pub disadvantages: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, alias = "recommended", alias = "isRecommended")]
    pub is_recommended: bool,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Normalizes a parsed batch into drafts, enforcing the batch invariants:
/// at most `MAX_STRATEGIES` entries, exactly one recommended, scores inside
/// `SCORE_MIN..=SCORE_MAX`. Entries without both a name and a description
/// are dropped; an empty remainder is an error (the caller wraps it into
/// `GenerationError::Unparsable` with the raw text attached).
pub fn into_drafts(items: Vec<LlmStrategy>) -> anyhow::Result<Vec<StrategyDraft>> {
    let mut drafts: Vec<StrategyDraft> = Vec::with_capacity(items.len());

    for item in items {
        let name = item.name.trim().to_string();
        let description = item.description.trim().to_string();
        if name.is_empty() || description.is_empty() {
            tracing::warn!(
                name = %name,
                "dropping strategy without name/description"
            );
            continue;
        }

        drafts.push(StrategyDraft {
            name,
            description,
            advantages: clean_lines(item.advantages),
            disadvantages: clean_lines(item.disadvantages),
            steps: clean_lines(item.steps),
            is_recommended: item.is_recommended,
            score: clamp_score(item.score),
        });
    }

    if drafts.is_empty() {
        bail!("no strategy with both a name and a description");
    }

    if drafts.len() > MAX_STRATEGIES {
        tracing::warn!(
            got = drafts.len(),
            keeping = MAX_STRATEGIES,
            "model returned too many strategies; truncating"
        );
        drafts.truncate(MAX_STRATEGIES);
    }
    if drafts.len() < MIN_STRATEGIES {
        tracing::warn!(
            got = drafts.len(),
            "model returned fewer strategies than requested; keeping what parsed"
        );
    }

    enforce_single_recommended(&mut drafts);
    Ok(drafts)
}

/// Exactly one strategy per batch carries the recommended flag. When the
/// model marks zero or several, the first parsed strategy wins and the
/// ambiguity is logged, never guessed around.
fn enforce_single_recommended(drafts: &mut [StrategyDraft]) {
    let marked = drafts.iter().filter(|d| d.is_recommended).count();
    if marked != 1 {
        tracing::warn!(
            marked,
            total = drafts.len(),
            "ambiguous recommended flag; selecting first parsed strategy"
        );
        for (i, draft) in drafts.iter_mut().enumerate() {
            draft.is_recommended = i == 0;
        }
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clamp_score(score: Option<f64>) -> f64 {
    match score {
        Some(s) if s.is_finite() => {
            if !(SCORE_MIN..=SCORE_MAX).contains(&s) {
                tracing::warn!(score = s, "score out of range; clamping");
            }
            s.clamp(SCORE_MIN, SCORE_MAX)
        }
        Some(s) => {
            tracing::warn!(score = s, "non-finite score; defaulting to 0");
            SCORE_MIN
        }
        None => SCORE_MIN,
    }
}
