// src/pipeline.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate, merge_enrichment};
use crate::config::Config;
use crate::enrich::Enrich;
use crate::errors::RunError;
use crate::extract::{visible_text, HeuristicExtractor, LlmAssist, LlmContact};
use crate::fetcher::Fetch;
use crate::models::{PartialSupplier, ResultTable, SearchQuery, SearchResultItem, SourcedField};
use crate::search::filter::select_candidates;
use crate::search::query_builder::{build_queries, compile_cert_terms};
use crate::search::{collect_results, SearchProvider};

/// Cooperative stop signal. Once raised, no new page fetches start;
/// whatever is in flight finishes and is kept.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wall-clock record for one candidate site.
#[derive(Debug, Clone)]
pub struct SiteTiming {
    pub url: String,
    pub seconds: f64,
    pub outcome: String,
}

/// Everything one run produced, for display, export and the last-run
/// buffer.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub query: SearchQuery,
    pub table: ResultTable,
    pub timings: Vec<SiteTiming>,
    pub results_seen: usize,
    pub candidates: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub skipped: usize,
    pub llm_assists: usize,
    pub suppliers_enriched: usize,
    pub elapsed: Duration,
    pub cancelled: bool,
}

enum CandidateOutcome {
    Extracted {
        partials: Vec<PartialSupplier>,
        pages: usize,
        timing: SiteTiming,
        llm_used: bool,
    },
    FetchFailed {
        timing: SiteTiming,
    },
    Skipped,
}

/// The discovery pipeline: query expansion, search, candidate filter,
/// bounded parallel fetch and extraction, aggregation, then optional
/// email enrichment. Workers only ever hand back immutable partials;
/// all merging happens here after collection.
pub struct SupplierPipeline {
    config: Config,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn Fetch>,
    llm: Option<Arc<dyn LlmAssist>>,
    enricher: Option<Arc<dyn Enrich>>,
}

impl SupplierPipeline {
    pub fn new(
        config: Config,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn Fetch>,
        llm: Option<Arc<dyn LlmAssist>>,
        enricher: Option<Arc<dyn Enrich>>,
    ) -> Self {
        Self {
            config,
            search,
            fetcher,
            llm,
            enricher,
        }
    }

    pub async fn run(
        &self,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            "Starting discovery run {} for '{}' in '{}' ({})",
            run_id, query.commodity, query.region, query.certification
        );

        let queries = build_queries(query)?;
        let results = collect_results(self.search.as_ref(), &queries, query.max_results).await?;
        let results_seen = results.len();

        let candidates = select_candidates(&results, query, self.assist_for_filtering()).await;
        let candidate_count = candidates.len();

        let cert_terms = compile_cert_terms(&query.certification);
        let extractor = HeuristicExtractor::new(&cert_terms, &self.config.extraction);

        let parallel = self.config.fetch.parallel_fetches.max(1);
        let outcomes: Vec<CandidateOutcome> = stream::iter(
            candidates
                .into_iter()
                .enumerate()
                .map(|(rank, item)| self.process_candidate(rank, item, &extractor, query, cancel)),
        )
        .buffer_unordered(parallel)
        .collect()
        .await;

        let mut partials: Vec<PartialSupplier> = Vec::new();
        let mut timings: Vec<SiteTiming> = Vec::new();
        let mut pages_fetched = 0usize;
        let mut fetch_failures = 0usize;
        let mut skipped = 0usize;
        let mut llm_assists = 0usize;

        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Extracted {
                    partials: site_partials,
                    pages,
                    timing,
                    llm_used,
                } => {
                    pages_fetched += pages;
                    if llm_used {
                        llm_assists += 1;
                    }
                    timings.push(timing);
                    partials.extend(site_partials);
                }
                CandidateOutcome::FetchFailed { timing } => {
                    fetch_failures += 1;
                    timings.push(timing);
                }
                CandidateOutcome::Skipped => skipped += 1,
            }
        }

        let mut table = aggregate(partials);
        info!(
            "Aggregated {} suppliers from {} fetched pages ({} fetch failures)",
            table.len(),
            pages_fetched,
            fetch_failures
        );

        let suppliers_enriched = self.enrich_table(&mut table, cancel).await;

        Ok(RunReport {
            run_id,
            query: query.clone(),
            table,
            timings,
            results_seen,
            candidates: candidate_count,
            pages_fetched,
            fetch_failures,
            skipped,
            llm_assists,
            suppliers_enriched,
            elapsed: started.elapsed(),
            cancelled: cancel.is_cancelled(),
        })
    }

    /// One candidate site: landing page, then a bounded number of
    /// contact/about pages, then the LLM assist when heuristics left the
    /// address unset. Returns immutable partials only.
    async fn process_candidate(
        &self,
        rank: usize,
        item: SearchResultItem,
        extractor: &HeuristicExtractor,
        query: &SearchQuery,
        cancel: &CancelFlag,
    ) -> CandidateOutcome {
        if cancel.is_cancelled() {
            debug!("Skipping {} (run cancelled)", item.url);
            return CandidateOutcome::Skipped;
        }

        let started = Instant::now();
        let html = match self.fetcher.fetch(&item.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Fetch failed for {}: {}", item.url, e);
                return CandidateOutcome::FetchFailed {
                    timing: SiteTiming {
                        url: item.url,
                        seconds: started.elapsed().as_secs_f64(),
                        outcome: format!("fetch failed: {e}"),
                    },
                };
            }
        };

        let mut first = extractor.extract(&item.url, &html);
        first.rank = rank;
        let mut partials = vec![first];
        let mut pages = 1usize;

        let links = extractor.contact_links(&item.url, &html, self.config.fetch.max_contact_pages);
        for link in links {
            if cancel.is_cancelled() {
                break;
            }
            match self.fetcher.fetch(&link).await {
                Ok(sub_html) => {
                    let mut sub = extractor.extract(&link, &sub_html);
                    sub.rank = rank;
                    partials.push(sub);
                    pages += 1;
                }
                Err(e) => debug!("Contact page fetch failed for {}: {}", link, e),
            }
        }

        let mut llm_used = false;
        if partials.iter().all(|p| p.address.is_none()) {
            if let Some(llm) = self.assist_for_extraction() {
                match llm.extract_contact(&visible_text(&html), &query.region).await {
                    Ok(contact) => {
                        let assist = partial_from_llm(&item.url, rank, contact);
                        if !assist.is_empty() {
                            partials.push(assist);
                            llm_used = true;
                        }
                    }
                    Err(e) => debug!(
                        "LLM assist failed for {} ({}), keeping heuristic fields",
                        item.url, e
                    ),
                }
            }
        }

        CandidateOutcome::Extracted {
            partials,
            pages,
            timing: SiteTiming {
                url: item.url,
                seconds: started.elapsed().as_secs_f64(),
                outcome: "ok".to_string(),
            },
            llm_used,
        }
    }

    /// Post-aggregation email enrichment in a small second pool, with a
    /// jittered politeness delay per lookup. Failures leave the supplier
    /// exactly as extraction produced it.
    async fn enrich_table(&self, table: &mut ResultTable, cancel: &CancelFlag) -> usize {
        let Some(enricher) = &self.enricher else {
            return 0;
        };
        if table.is_empty() || cancel.is_cancelled() {
            return 0;
        }

        let delay = self.config.enrichment.delay_ms;
        let jobs = table.suppliers.iter().enumerate().map(|(index, supplier)| {
            let domain = supplier.website.clone();
            let enricher = enricher.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (index, Vec::new());
                }
                if delay > 0 {
                    let jitter = fastrand::u64(0..=delay / 2);
                    tokio::time::sleep(Duration::from_millis(delay + jitter)).await;
                }
                match enricher.enrich(&domain).await {
                    Ok(emails) => (index, emails),
                    Err(e) => {
                        warn!("Enrichment failed for {}: {}", domain, e);
                        (index, Vec::new())
                    }
                }
            }
        });

        let parallel = self.config.enrichment.parallel_requests.max(1);
        let results: Vec<(usize, Vec<String>)> =
            stream::iter(jobs).buffer_unordered(parallel).collect().await;

        let cap = self.config.enrichment.email_limit;
        let mut enriched = 0;
        for (index, emails) in results {
            if emails.is_empty() {
                continue;
            }
            merge_enrichment(&mut table.suppliers[index], emails, cap);
            enriched += 1;
        }
        enriched
    }

    fn assist_for_filtering(&self) -> Option<&dyn LlmAssist> {
        if self.config.search.use_llm_domain_filter {
            self.llm.as_deref()
        } else {
            None
        }
    }

    fn assist_for_extraction(&self) -> Option<&dyn LlmAssist> {
        if self.config.extraction.use_llm_extraction {
            self.llm.as_deref()
        } else {
            None
        }
    }
}

fn partial_from_llm(url: &str, rank: usize, contact: LlmContact) -> PartialSupplier {
    let mut partial = PartialSupplier::new(url, rank);
    partial.name = contact.company_name.map(SourcedField::llm);
    partial.address = contact.address_best.map(SourcedField::llm);
    partial.phone = contact.phone_best.map(SourcedField::llm);
    partial.emails = contact.emails;
    partial
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::{EnrichError, FetchError, LlmError, SearchError};
    use crate::models::Provenance;

    struct StaticSearch {
        items: Vec<SearchResultItem>,
    }

    #[async_trait]
    impl SearchProvider for StaticSearch {
        async fn search(
            &self,
            query: &str,
            _limit: usize,
        ) -> Result<Vec<SearchResultItem>, SearchError> {
            // only the first query string returns hits, the rest are empty
            if query.contains("supplier") {
                Ok(self.items.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Fetch for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    struct StubAssist {
        address: Option<String>,
        extract_calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmAssist for StubAssist {
        async fn extract_contact(
            &self,
            _page_text: &str,
            _region: &str,
        ) -> Result<LlmContact, LlmError> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmContact {
                company_name: None,
                address_best: self.address.clone(),
                phone_best: None,
                emails: Vec::new(),
            })
        }

        async fn is_company_domain(
            &self,
            _domain: &str,
            _title: &str,
            _snippet: &str,
            _query: &SearchQuery,
        ) -> Result<bool, LlmError> {
            Ok(true)
        }
    }

    struct StubEnricher {
        emails: Vec<String>,
    }

    #[async_trait]
    impl Enrich for StubEnricher {
        async fn enrich(&self, _domain: &str) -> Result<Vec<String>, EnrichError> {
            Ok(self.emails.clone())
        }
    }

    fn item(url: &str) -> SearchResultItem {
        SearchResultItem {
            title: "gasket manufacturer".to_string(),
            url: url.to_string(),
            snippet: String::new(),
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("gaskets", "Pune", "IATF 16949")
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.enrichment.delay_ms = 0;
        config
    }

    fn pipeline_with(
        config: Config,
        pages: HashMap<String, String>,
        items: Vec<SearchResultItem>,
        llm: Option<Arc<dyn LlmAssist>>,
        enricher: Option<Arc<dyn Enrich>>,
    ) -> SupplierPipeline {
        SupplierPipeline::new(
            config,
            Arc::new(StaticSearch { items }),
            Arc::new(MapFetcher { pages }),
            llm,
            enricher,
        )
    }

    fn acme_pages() -> HashMap<String, String> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://acme.com".to_string(),
            r#"<head><title>Acme Gaskets</title></head>
               <body><a href="/contact">Contact us</a>
               <p>sales@acme.com</p>
               <p>IATF 16949 certified plant</p></body>"#
                .to_string(),
        );
        pages.insert(
            "https://acme.com/contact".to_string(),
            r#"<body><p>quality@acme.com</p>
               <h2>Contact</h2><p>12 Industrial Estate Phase 1, Pune 411019</p></body>"#
                .to_string(),
        );
        pages
    }

    #[tokio::test]
    async fn merges_contact_pages_into_one_supplier() {
        let pipeline = pipeline_with(
            test_config(),
            acme_pages(),
            vec![item("https://acme.com")],
            None,
            None,
        );

        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.pages_fetched, 2);

        let supplier = &report.table.suppliers[0];
        assert_eq!(supplier.website, "acme.com");
        assert_eq!(
            supplier.emails,
            vec!["quality@acme.com".to_string(), "sales@acme.com".to_string()]
        );
        assert_eq!(supplier.name.as_ref().unwrap().value, "Acme Gaskets");
        assert!(supplier
            .address
            .as_ref()
            .unwrap()
            .value
            .starts_with("12 Industrial Estate"));
        assert_eq!(supplier.certification_evidence.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_drops_candidate_and_keeps_the_run() {
        let pipeline = pipeline_with(
            test_config(),
            acme_pages(),
            vec![item("https://downsite.com"), item("https://acme.com")],
            None,
            None,
        );

        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert_eq!(report.table.len(), 1);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.table.suppliers[0].website, "acme.com");
        assert!(report
            .timings
            .iter()
            .any(|t| t.url == "https://downsite.com" && t.outcome.contains("fetch failed")));
    }

    #[tokio::test]
    async fn llm_assist_fills_missing_address_when_enabled() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://bare.com".to_string(),
            "<body><p>sales@bare.com</p></body>".to_string(),
        );
        let assist = Arc::new(StubAssist {
            address: Some("Plot 5, Pune".to_string()),
            extract_calls: AtomicUsize::new(0),
        });

        let mut config = test_config();
        config.extraction.use_llm_extraction = true;
        let pipeline = pipeline_with(
            config,
            pages,
            vec![item("https://bare.com")],
            Some(assist.clone()),
            None,
        );

        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        let supplier = &report.table.suppliers[0];
        let address = supplier.address.as_ref().unwrap();
        assert_eq!(address.value, "Plot 5, Pune");
        assert_eq!(address.provenance, Provenance::Llm);
        assert_eq!(report.llm_assists, 1);
        assert_eq!(assist.extract_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn llm_assist_stays_idle_when_disabled_or_not_needed() {
        // disabled: address stays unset
        let mut pages = HashMap::new();
        pages.insert(
            "https://bare.com".to_string(),
            "<body><p>sales@bare.com</p></body>".to_string(),
        );
        let pipeline = pipeline_with(
            test_config(),
            pages,
            vec![item("https://bare.com")],
            Some(Arc::new(StubAssist {
                address: Some("Plot 5, Pune".to_string()),
                extract_calls: AtomicUsize::new(0),
            })),
            None,
        );
        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert!(report.table.suppliers[0].address.is_none());
        assert_eq!(report.llm_assists, 0);

        // enabled but the heuristics already found an address: no call
        let assist = Arc::new(StubAssist {
            address: Some("should not be used".to_string()),
            extract_calls: AtomicUsize::new(0),
        });
        let mut config = test_config();
        config.extraction.use_llm_extraction = true;
        let pipeline = pipeline_with(
            config,
            acme_pages(),
            vec![item("https://acme.com")],
            Some(assist.clone()),
            None,
        );
        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert_eq!(assist.extract_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            report.table.suppliers[0].address.as_ref().unwrap().provenance,
            Provenance::Heuristic
        );
    }

    #[tokio::test]
    async fn enrichment_widens_emails_after_aggregation() {
        let pipeline = pipeline_with(
            test_config(),
            acme_pages(),
            vec![item("https://acme.com")],
            None,
            Some(Arc::new(StubEnricher {
                emails: vec!["hr@acme.com".to_string(), "sales@acme.com".to_string()],
            })),
        );

        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert_eq!(report.suppliers_enriched, 1);
        assert_eq!(
            report.table.suppliers[0].emails,
            vec![
                "hr@acme.com".to_string(),
                "quality@acme.com".to_string(),
                "sales@acme.com".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_run_submits_nothing_and_reports_it() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let pipeline = pipeline_with(
            test_config(),
            acme_pages(),
            vec![item("https://acme.com")],
            None,
            None,
        );

        let report = pipeline.run(&query(), &cancel).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pages_fetched, 0);
        assert!(report.table.is_empty());
    }

    #[tokio::test]
    async fn no_candidates_is_an_empty_table_not_an_error() {
        let pipeline = pipeline_with(
            test_config(),
            HashMap::new(),
            Vec::new(),
            None,
            None,
        );

        let report = pipeline.run(&query(), &CancelFlag::new()).await.unwrap();
        assert!(report.table.is_empty());
        assert_eq!(report.results_seen, 0);
        assert_eq!(report.candidates, 0);
    }
}
