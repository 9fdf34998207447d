// src/search/filter.rs
use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::aggregate::normalize_website;
use crate::extract::LlmAssist;
use crate::models::{SearchQuery, SearchResultItem};
use crate::search::query_builder::{is_blacklisted_domain, is_likely_supplier_result};

/// Maps raw search hits to fetch candidates: drops marketplace domains,
/// drops hits without supplier vocabulary, keeps one hit per site, and
/// optionally asks the LLM whether the domain is a company site. The
/// LLM call fails open so a provider outage cannot empty a run.
pub async fn select_candidates(
    results: &[SearchResultItem],
    query: &SearchQuery,
    llm: Option<&dyn LlmAssist>,
) -> Vec<SearchResultItem> {
    let mut decisions: HashMap<String, bool> = HashMap::new();
    let mut seen_sites: HashSet<String> = HashSet::new();
    let mut kept = Vec::new();

    for item in results {
        let Some(site) = normalize_website(&item.url) else {
            debug!("Dropping result with unparseable URL: {}", item.url);
            continue;
        };
        if seen_sites.contains(&site) {
            continue;
        }
        if is_blacklisted_domain(&site) {
            debug!("Dropping blacklisted domain: {}", site);
            continue;
        }
        if !is_likely_supplier_result(&item.title, &item.snippet) {
            debug!("Dropping result without supplier vocabulary: {}", item.url);
            continue;
        }

        if let Some(llm) = llm {
            let verdict = match decisions.get(&site) {
                Some(v) => *v,
                None => {
                    let v = llm
                        .is_company_domain(&site, &item.title, &item.snippet, query)
                        .await
                        .unwrap_or(true);
                    decisions.insert(site.clone(), v);
                    v
                }
            };
            if !verdict {
                debug!("LLM classified {} as a marketplace", site);
                continue;
            }
        }

        seen_sites.insert(site);
        kept.push(item.clone());
    }

    info!(
        "Kept {} of {} search results as candidates",
        kept.len(),
        results.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::errors::LlmError;
    use crate::extract::LlmContact;

    fn item(url: &str, title: &str) -> SearchResultItem {
        SearchResultItem {
            title: title.to_string(),
            url: url.to_string(),
            snippet: String::new(),
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("gaskets", "Pune", "ISO 9001")
    }

    struct RejectingAssist {
        reject: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LlmAssist for RejectingAssist {
        async fn extract_contact(
            &self,
            _page_text: &str,
            _region: &str,
        ) -> Result<LlmContact, LlmError> {
            Ok(LlmContact::default())
        }

        async fn is_company_domain(
            &self,
            domain: &str,
            _title: &str,
            _snippet: &str,
            _query: &SearchQuery,
        ) -> Result<bool, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::Malformed("provider down".to_string()));
            }
            Ok(domain != self.reject)
        }
    }

    #[tokio::test]
    async fn drops_blacklist_missing_hints_and_repeat_sites() {
        let results = vec![
            item("https://www.acme.com/", "Acme gasket manufacturer"),
            item("https://acme.com/products", "Acme gasket supplier catalog"),
            item("https://dir.indiamart.com/pune/gaskets", "Gasket suppliers directory"),
            item("https://food-blog.example", "Ten best biryani places"),
        ];

        let kept = select_candidates(&results, &query(), None).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://www.acme.com/");
    }

    #[tokio::test]
    async fn llm_rejections_are_cached_per_domain() {
        let assist = RejectingAssist {
            reject: "listings.example",
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let results = vec![
            item("https://listings.example/a", "gasket supplier listings"),
            item("https://listings.example/b", "more gasket supplier listings"),
            item("https://acme.com", "Acme gasket manufacturer"),
        ];

        let kept = select_candidates(&results, &query(), Some(&assist)).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://acme.com");
        // one call per distinct domain, the repeat hit uses the cache
        assert_eq!(assist.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn llm_failure_fails_open() {
        let assist = RejectingAssist {
            reject: "acme.com",
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let results = vec![item("https://acme.com", "Acme gasket manufacturer")];

        let kept = select_candidates(&results, &query(), Some(&assist)).await;
        assert_eq!(kept.len(), 1);
    }
}
