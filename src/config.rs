// src/config.rs
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    pub extraction: ExtractionConfig,
    pub enrichment: EnrichmentConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Default cap on combined organic results; the prompt lets the user
    /// override it per run.
    pub default_max_results: usize,
    /// Ask the LLM whether a domain is a company site before fetching it.
    /// Needs OPENAI_API_KEY; ignored without one.
    pub use_llm_domain_filter: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub parallel_fetches: usize,
    /// Contact/about pages followed per site beyond the landing page.
    pub max_contact_pages: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// Ask the LLM for structured contact data when heuristics leave the
    /// address unset. Needs OPENAI_API_KEY; ignored without one.
    pub use_llm_extraction: bool,
    pub max_emails_per_page: usize,
    /// Characters of page text sent to the LLM, from the top of the page.
    pub llm_text_limit: usize,
    /// Characters kept on each side of a certification mention.
    pub evidence_window: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    pub email_limit: usize,
    pub parallel_requests: usize,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                default_max_results: 20,
                use_llm_domain_filter: false,
            },
            fetch: FetchConfig {
                timeout_seconds: 10,
                parallel_fetches: 6,
                max_contact_pages: 2,
                user_agent: "Mozilla/5.0 (compatible; SupplierFinder/1.0)".to_string(),
            },
            extraction: ExtractionConfig {
                use_llm_extraction: false,
                max_emails_per_page: 5,
                llm_text_limit: 12_000,
                evidence_window: 60,
            },
            enrichment: EnrichmentConfig {
                email_limit: 5,
                parallel_requests: 2,
                delay_ms: 500,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            output: OutputConfig {
                directory: "out".to_string(),
            },
        }
    }
}

pub async fn load_config(path: &str) -> std::result::Result<Config, ConfigError> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}
