use crate::domain::contract::{self, LlmStrategy};
use crate::domain::strategy::StrategyDraft;
use crate::error::GenerationError;

/// Parses the model's reply into 1..=3 strategy drafts. JSON extraction is
/// tried first (the prompt demands JSON); labelled plain-text sections are
/// the fallback for models that answer in prose anyway. Fails with
/// `GenerationError::Unparsable` only when neither pass finds a single
/// strategy with a name and a description.
pub fn parse(raw: &str) -> anyhow::Result<Vec<StrategyDraft>> {
    let items = parse_json(raw)
        .filter(|items| !items.is_empty())
        .or_else(|| {
            let sections = parse_sections(raw);
            if sections.is_empty() {
                None
            } else {
                Some(sections)
            }
        });

    let Some(items) = items else {
        return Err(GenerationError::Unparsable {
            detail: "no JSON batch and no labelled strategy sections found".to_string(),
            raw_output: raw.to_string(),
        }
        .into());
    };

    contract::into_drafts(items).map_err(|err| {
        anyhow::Error::new(GenerationError::Unparsable {
            detail: format!("{err:#}"),
            raw_output: raw.to_string(),
        })
    })
}

/// Best-effort JSON extraction: strip Markdown fences, otherwise take the
/// outermost object or array by bracket span.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let obj = trimmed.find('{');
    let arr = trimmed.find('[');
    let (open, close) = match (arr, obj) {
        (Some(a), Some(o)) if a < o => (a, trimmed.rfind(']')?),
        (Some(a), None) => (a, trimmed.rfind(']')?),
        (_, Some(o)) => (o, trimmed.rfind('}')?),
        (None, None) => return None,
    };
    if close <= open {
        return None;
    }
    Some(trimmed[open..=close].trim().to_string())
}

fn parse_json(raw: &str) -> Option<Vec<LlmStrategy>> {
    let json_str = extract_json(raw)?;
    let value = serde_json::from_str::<serde_json::Value>(&json_str).ok()?;

    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).ok(),
        serde_json::Value::Object(ref map) => {
            if let Some(batch) = map.get("strategies") {
                serde_json::from_value(batch.clone()).ok()
            } else {
                // A bare object is treated as a batch of one.
                serde_json::from_value::<LlmStrategy>(value).ok().map(|s| vec![s])
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Advantages,
    Disadvantages,
    Steps,
    Recommended,
    Score,
}

/// Fallback extraction over labelled sections, e.g.
/// `Name: ...` / `Advantages:` followed by bullet lines. Chinese labels are
/// accepted because upstream activity data is frequently Chinese and some
/// models mirror the input language.
fn parse_sections(raw: &str) -> Vec<LlmStrategy> {
    let mut items: Vec<LlmStrategy> = Vec::new();
    let mut current: Option<LlmStrategy> = None;
    let mut active_list: Option<Field> = None;

    for line in raw.lines() {
        if let Some((field, rest)) = match_label(line) {
            if field == Field::Name {
                if let Some(done) = current.take() {
                    items.push(done);
                }
                current = Some(LlmStrategy {
                    name: rest,
                    ..LlmStrategy::default()
                });
                active_list = None;
                continue;
            }

            let Some(strategy) = current.as_mut() else {
                continue;
            };
            active_list = None;
            match field {
                Field::Name => unreachable!(),
                Field::Description => strategy.description = rest,
                Field::Advantages | Field::Disadvantages | Field::Steps => {
                    active_list = Some(field);
                    if !rest.is_empty() {
                        list_for(strategy, field).push(rest);
                    }
                }
                Field::Recommended => strategy.is_recommended = truthy(&rest),
                Field::Score => strategy.score = leading_number(&rest),
            }
            continue;
        }

        if let (Some(strategy), Some(field)) = (current.as_mut(), active_list) {
            if let Some(item) = bullet_content(line) {
                list_for(strategy, field).push(item);
            }
        }
    }

    if let Some(done) = current.take() {
        items.push(done);
    }
    items
}

fn match_label(line: &str) -> Option<(Field, String)> {
    let stripped = line
        .trim()
        .trim_start_matches(|c: char| {
            matches!(c, '#' | '*' | '-' | '•' | '.' | ')' | '、') || c.is_ascii_digit()
        })
        .trim();

    let (head, rest) = stripped
        .split_once(':')
        .or_else(|| stripped.split_once('：'))?;
    let head = head.trim().trim_matches('*').trim().to_ascii_lowercase();

    let field = match head.as_str() {
        "name" | "strategy name" | "strategy" | "名称" | "策略名称" => Field::Name,
        "description" | "描述" | "说明" | "策略描述" => Field::Description,
        "advantages" | "pros" | "优势" | "优点" => Field::Advantages,
        "disadvantages" | "cons" | "劣势" | "缺点" => Field::Disadvantages,
        "steps" | "implementation steps" | "步骤" | "实施步骤" => Field::Steps,
        "recommended" | "is_recommended" | "推荐" | "是否推荐" => Field::Recommended,
        "score" | "评分" | "得分" => Field::Score,
        _ => return None,
    };
    Some((field, rest.trim().trim_start_matches('*').trim().to_string()))
}

fn list_for(strategy: &mut LlmStrategy, field: Field) -> &mut Vec<String> {
    match field {
        Field::Advantages => &mut strategy.advantages,
        Field::Disadvantages => &mut strategy.disadvantages,
        Field::Steps => &mut strategy.steps,
        _ => unreachable!("not a list field"),
    }
}

fn bullet_content(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('•'))
        .or_else(|| {
            let i = trimmed.find(|c: char| !c.is_ascii_digit())?;
            if i == 0 {
                return None;
            }
            let delim = trimmed[i..].chars().next()?;
            if !matches!(delim, '.' | ')' | '、') {
                return None;
            }
            Some(&trimmed[i + delim.len_utf8()..])
        })?;
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn truthy(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "是" | "推荐"
    )
}

fn leading_number(s: &str) -> Option<f64> {
    let token: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    token.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strategy_json(name: &str, recommended: bool, score: f64) -> serde_json::Value {
        json!({
            "name": name,
            "description": format!("{name}: join the 携程 activity"),
            "advantages": ["more visibility"],
            "disadvantages": ["8% commission"],
            "steps": ["enroll", "set allotment"],
            "is_recommended": recommended,
            "score": score,
        })
    }

    #[test]
    fn parses_plain_json_array() {
        let raw = json!([
            strategy_json("Full participation", true, 86.0),
            strategy_json("Partial participation", false, 71.0),
        ])
        .to_string();

        let drafts = parse(&raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert!(drafts[0].is_recommended);
        assert!(!drafts[1].is_recommended);
        assert_eq!(drafts[0].steps.len(), 2);
    }

    #[test]
    fn parses_fenced_json_with_prose_around_it() {
        let body = json!([
            strategy_json("A", true, 80.0),
            strategy_json("B", false, 60.0),
        ])
        .to_string();
        let raw = format!("Here is my analysis:\n```json\n{body}\n```\nGood luck!");

        let drafts = parse(&raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "A");
    }

    #[test]
    fn parses_strategies_wrapper_object() {
        let raw = json!({
            "strategies": [
                strategy_json("A", false, 50.0),
                strategy_json("B", false, 40.0),
            ]
        })
        .to_string();

        let drafts = parse(&raw).unwrap();
        assert_eq!(drafts.len(), 2);
        // Zero marked recommended: first parsed wins.
        assert!(drafts[0].is_recommended);
    }

    #[test]
    fn missing_disadvantages_defaults_to_empty() {
        let raw = json!([
            {
                "name": "A",
                "description": "d",
                "advantages": ["x"],
                "steps": ["y"],
                "is_recommended": true,
                "score": 70.0
            },
            strategy_json("B", false, 60.0),
        ])
        .to_string();

        let drafts = parse(&raw).unwrap();
        assert!(drafts[0].disadvantages.is_empty());
    }

    #[test]
    fn falls_back_to_labelled_sections() {
        let raw = "\
Strategy analysis below.

1. Name: Full participation
   Description: Join the 携程 8.5折 activity with all room types.
   Advantages:
   - strong listing exposure
   - fills the March booking window
   Disadvantages:
   - 8% commission
   Steps:
   1. enroll before March 1
   2. open standard and suite allotment
   Recommended: yes
   Score: 85

2. Name: Partial participation
   Description: Join with standard rooms only.
   Advantages:
   - limits commission exposure
   Steps:
   - enroll with a capped allotment
   Recommended: no
   Score: 70
";

        let drafts = parse(raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Full participation");
        assert_eq!(drafts[0].advantages.len(), 2);
        assert_eq!(drafts[0].disadvantages.len(), 1);
        assert_eq!(drafts[0].steps.len(), 2);
        assert!(drafts[0].is_recommended);
        assert_eq!(drafts[0].score, 85.0);
        assert!(drafts[1].disadvantages.is_empty());
        assert!(!drafts[1].is_recommended);
    }

    #[test]
    fn garbage_is_unparsable() {
        let err = parse("The weather is nice today.").unwrap_err();
        let gen = err.downcast_ref::<GenerationError>().unwrap();
        assert!(matches!(gen, GenerationError::Unparsable { .. }));
    }

    #[test]
    fn json_without_names_is_unparsable() {
        let raw = json!([{"score": 10.0}, {"score": 20.0}]).to_string();
        let err = parse(&raw).unwrap_err();
        let gen = err.downcast_ref::<GenerationError>().unwrap();
        assert!(matches!(gen, GenerationError::Unparsable { .. }));
    }

    #[test]
    fn extract_json_handles_fences_and_brackets() {
        let body = "[{\"a\":1}]";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
        assert_eq!(
            extract_json("prefix [{\"a\":1}] suffix"),
            Some(body.to_string())
        );
        assert_eq!(
            extract_json("prefix {\"a\":1} suffix"),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn batch_of_three_keeps_exactly_one_recommended() {
        let raw = json!([
            strategy_json("A", true, 90.0),
            strategy_json("B", true, 80.0),
            strategy_json("C", false, 70.0),
        ])
        .to_string();

        let drafts = parse(&raw).unwrap();
        assert_eq!(drafts.len(), 3);
        let marked = drafts.iter().filter(|d| d.is_recommended).count();
        assert_eq!(marked, 1);
        assert!(drafts[0].is_recommended);
        for d in &drafts {
            assert!(!d.name.is_empty());
            assert!(!d.description.is_empty());
        }
    }
}
