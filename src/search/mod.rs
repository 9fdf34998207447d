// src/search/mod.rs
pub mod filter;
pub mod query_builder;
pub mod serpapi;

// Re-export main types for convenience
pub use serpapi::SerpApiClient;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::SearchError;
use crate::models::SearchResultItem;

/// Narrow seam over the external search provider so tests can run
/// against a canned implementation.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError>;
}

/// Runs every query string in order and combines the hits, keeping
/// provider order, dropping duplicate URLs and capping the combined set
/// at `max_results`. Individual query failures are tolerated; the run
/// only fails when no query succeeded at all.
pub async fn collect_results(
    provider: &dyn SearchProvider,
    queries: &[String],
    max_results: usize,
) -> Result<Vec<SearchResultItem>, SearchError> {
    let per_query = (max_results / queries.len().max(1)).max(1);
    let mut items: Vec<SearchResultItem> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut succeeded = 0usize;
    let mut last_error: Option<SearchError> = None;

    for query in queries {
        match provider.search(query, per_query).await {
            Ok(batch) => {
                succeeded += 1;
                for item in batch {
                    if items.len() >= max_results {
                        break;
                    }
                    if seen_urls.insert(item.url.clone()) {
                        items.push(item);
                    }
                }
            }
            Err(e) => {
                warn!("Search query failed: {} ({})", e, query);
                last_error = Some(e);
            }
        }
        if items.len() >= max_results {
            break;
        }
    }

    if succeeded == 0 {
        return Err(last_error.unwrap_or(SearchError::AllQueriesFailed(queries.len())));
    }

    info!(
        "Collected {} unique results from {} of {} queries",
        items.len(),
        succeeded,
        queries.len()
    );
    Ok(items)
}
