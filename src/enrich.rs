// src/enrich.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::EnrichError;

const HUNTER_URL: &str = "https://api.hunter.io/v2/domain-search";
const ENRICH_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_LIMIT: usize = 10;

/// Seam over the email enrichment provider. Runs after aggregation, one
/// lookup per deduplicated supplier domain.
#[async_trait]
pub trait Enrich: Send + Sync {
    async fn enrich(&self, domain: &str) -> Result<Vec<String>, EnrichError>;
}

#[derive(Debug, Deserialize)]
struct HunterResponse {
    #[serde(default)]
    data: HunterData,
}

#[derive(Debug, Default, Deserialize)]
struct HunterData {
    #[serde(default)]
    emails: Vec<HunterEmail>,
}

#[derive(Debug, Deserialize)]
struct HunterEmail {
    #[serde(default)]
    value: String,
}

pub struct HunterClient {
    api_key: String,
    client: reqwest::Client,
}

impl HunterClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ENRICH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }
}

#[async_trait]
impl Enrich for HunterClient {
    async fn enrich(&self, domain: &str) -> Result<Vec<String>, EnrichError> {
        let limit = REQUEST_LIMIT.to_string();
        let response = self
            .client
            .get(HUNTER_URL)
            .query(&[
                ("domain", domain),
                ("api_key", self.api_key.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::Provider(status.as_u16()));
        }

        let data: HunterResponse = response.json().await?;
        let emails: Vec<String> = data
            .data
            .emails
            .into_iter()
            .map(|e| e.value.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        debug!("Enrichment found {} emails for {}", emails.len(), domain);
        Ok(emails)
    }
}
