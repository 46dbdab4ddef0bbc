pub mod deepseek;
pub mod parse;
pub mod prompt;

/// Enumerated model choice exposed to operators. Maps onto the DeepSeek
/// model identifiers the chat endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    R1Plus,
    R1,
    Coder,
}

impl ModelChoice {
    pub fn model_id(self) -> &'static str {
        match self {
            Self::R1Plus => "deepseek-reasoner-plus",
            Self::R1 => "deepseek-reasoner",
            Self::Coder => "deepseek-coder",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r1-plus" | "r1_plus" | "deepseek-reasoner-plus" => Ok(Self::R1Plus),
            "r1" | "deepseek-reasoner" => Ok(Self::R1),
            "coder" | "deepseek-coder" => Ok(Self::Coder),
            other => anyhow::bail!("unknown model choice: {other}"),
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> ModelChoice;

    /// One completion round-trip. Returns the assistant text plus the raw
    /// response JSON, kept for diagnostics and auditing.
    async fn complete(&self, prompt: &str) -> anyhow::Result<(String, serde_json::Value)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_choice_parses_operator_spellings() {
        assert_eq!(ModelChoice::parse("R1-Plus").unwrap(), ModelChoice::R1Plus);
        assert_eq!(ModelChoice::parse("r1").unwrap(), ModelChoice::R1);
        assert_eq!(ModelChoice::parse("Coder").unwrap(), ModelChoice::Coder);
        assert!(ModelChoice::parse("gpt-4").is_err());
    }
}
