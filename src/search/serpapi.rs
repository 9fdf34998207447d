// src/search/serpapi.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::SearchError;
use crate::models::SearchResultItem;
use crate::search::SearchProvider;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

pub struct SerpApiClient {
    api_key: String,
    client: reqwest::Client,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { api_key, client }
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError> {
        let num = limit.clamp(1, 100).to_string();
        debug!("SerpAPI query: {}", query);

        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("hl", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Provider {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let data: SerpApiResponse = response.json().await?;
        let results: Vec<SearchResultItem> = data
            .organic_results
            .into_iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| SearchResultItem {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect();

        info!("SerpAPI returned {} organic results", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_organic_results() {
        let payload = r#"{
            "organic_results": [
                {"title": "Acme Gaskets", "link": "https://acme.com", "snippet": "IATF 16949 certified", "position": 1},
                {"title": "No link here", "snippet": "ignored"}
            ],
            "search_metadata": {"status": "Success"}
        }"#;

        let parsed: SerpApiResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.organic_results.len(), 2);
        assert_eq!(parsed.organic_results[0].link, "https://acme.com");
        assert!(parsed.organic_results[1].link.is_empty());
    }

    #[test]
    fn tolerates_missing_organic_results() {
        let parsed: SerpApiResponse = serde_json::from_str(r#"{"search_metadata": {}}"#).unwrap();
        assert!(parsed.organic_results.is_empty());
    }
}
