pub mod domain;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod storage;

pub mod config {
    use crate::error::GenerationError;
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub deepseek_api_key: Option<String>,
        pub deepseek_base_url: Option<String>,
        pub deepseek_model: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                deepseek_api_key: std::env::var("DEEPSEEK_API_KEY").ok(),
                deepseek_base_url: std::env::var("DEEPSEEK_BASE_URL").ok(),
                deepseek_model: std::env::var("DEEPSEEK_MODEL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        /// A missing credential is a deployment gap, not a client error; it is
        /// reported as `GenerationError::Authentication` so the boundary maps
        /// it to 503.
        pub fn require_deepseek_api_key(&self) -> anyhow::Result<&str> {
            match self
                .deepseek_api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
            {
                Some(key) => Ok(key),
                None => Err(GenerationError::Authentication {
                    detail: "DEEPSEEK_API_KEY is not set".to_string(),
                }
                .into()),
            }
        }
    }
}
