// src/cli/run_discovery.rs
use std::sync::Arc;
use std::time::Duration;

use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use tokio::signal;
use tracing::warn;

use crate::enrich::{Enrich, HunterClient};
use crate::errors::{ConfigError, RunError};
use crate::extract::{LlmAssist, OpenAiAssist};
use crate::fetcher::HttpFetcher;
use crate::models::{CliApp, Result, SearchQuery};
use crate::pipeline::{CancelFlag, RunReport, SupplierPipeline};
use crate::search::SerpApiClient;

impl CliApp {
    pub async fn run_discovery(&self) -> Result<()> {
        println!("\n🔎 Supplier Discovery");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let commodity: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Commodity / part")
            .interact_text()?;
        let region: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Region")
            .interact_text()?;
        let certification: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Certification")
            .interact_text()?;
        let max_results: usize = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Max search results")
            .default(self.config.search.default_max_results)
            .interact_text()?;

        let mut query = SearchQuery::new(&commodity, &region, &certification);
        query.max_results = max_results;

        let pipeline = match self.build_pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                println!("\n❌ Configuration problem: {e}");
                return Ok(());
            }
        };

        println!("\n⏳ Running discovery (Ctrl+C stops after in-flight work finishes)...");

        let cancel = CancelFlag::new();
        let run_future = pipeline.run(&query, &cancel);
        tokio::pin!(run_future);

        let outcome = tokio::select! {
            result = &mut run_future => result,
            _ = signal::ctrl_c() => {
                println!("\n🛑 Stopping: letting in-flight fetches finish...");
                cancel.cancel();
                run_future.await
            }
        };

        let report = match outcome {
            Ok(report) => report,
            Err(RunError::Config(e)) => {
                println!("\n❌ Invalid input: {e}");
                return Ok(());
            }
            Err(RunError::Search(e)) => {
                println!("\n❌ Search failed: {e}");
                println!("   No suppliers were collected. Check the SerpAPI key and its quota.");
                return Ok(());
            }
        };

        display_report(&report);

        let has_rows = !report.table.is_empty();
        *self.last_run.lock().await = Some(report);

        if has_rows {
            let export_now = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Export these results now?")
                .default(true)
                .interact()?;
            if export_now {
                self.run_export().await?;
            }
        }

        Ok(())
    }

    /// Builds the provider set from the environment. Search is required;
    /// LLM assist and enrichment are wired in only when their keys exist.
    fn build_pipeline(&self) -> std::result::Result<SupplierPipeline, ConfigError> {
        let serpapi_key = require_env("SERPAPI_API_KEY", "search")?;
        let openai_key = optional_env("OPENAI_API_KEY");
        let hunter_key = optional_env("HUNTER_API_KEY");

        let wants_llm =
            self.config.search.use_llm_domain_filter || self.config.extraction.use_llm_extraction;
        let llm: Option<Arc<dyn LlmAssist>> = match (openai_key, wants_llm) {
            (Some(key), true) => Some(Arc::new(OpenAiAssist::new(
                key,
                self.config.extraction.llm_text_limit,
            ))),
            (None, true) => {
                warn!("LLM features are enabled in config but OPENAI_API_KEY is not set, continuing without them");
                None
            }
            _ => None,
        };

        let enricher: Option<Arc<dyn Enrich>> =
            hunter_key.map(|key| Arc::new(HunterClient::new(key)) as Arc<dyn Enrich>);

        let fetcher = HttpFetcher::new(
            Duration::from_secs(self.config.fetch.timeout_seconds),
            &self.config.fetch.user_agent,
        );

        Ok(SupplierPipeline::new(
            self.config.clone(),
            Arc::new(SerpApiClient::new(serpapi_key)),
            Arc::new(fetcher),
            llm,
            enricher,
        ))
    }
}

fn display_report(report: &RunReport) {
    println!(
        "\n📊 Run {} (\"{}\" in {}) finished in {:.1}s{}",
        report.run_id,
        report.query.commodity,
        report.query.region,
        report.elapsed.as_secs_f64(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🔎 Search results: {}", report.results_seen);
    println!(
        "🎯 Candidate sites: {} ({} fetch failures, {} skipped)",
        report.candidates, report.fetch_failures, report.skipped
    );
    println!("📄 Pages fetched: {}", report.pages_fetched);
    if report.llm_assists > 0 {
        println!("🤖 LLM assists: {}", report.llm_assists);
    }
    if report.suppliers_enriched > 0 {
        println!("📧 Suppliers enriched: {}", report.suppliers_enriched);
    }
    println!("🏭 Suppliers found: {}", report.table.len());

    if report.table.is_empty() {
        println!("\n😕 No suppliers extracted. The search succeeded but no candidate page yielded data.");
        println!("   Try a broader commodity, another region wording, or more results.");
        return;
    }

    println!("\n🏆 Suppliers:");
    for supplier in report.table.suppliers.iter().take(15) {
        let mut have = Vec::new();
        if !supplier.emails.is_empty() {
            have.push(format!("{} email(s)", supplier.emails.len()));
        }
        if supplier.phone.is_some() {
            have.push("phone".to_string());
        }
        if supplier.address.is_some() {
            have.push("address".to_string());
        }
        if !supplier.certification_evidence.is_empty() {
            have.push(format!(
                "{} cert mention(s)",
                supplier.certification_evidence.len()
            ));
        }
        let have = if have.is_empty() {
            "no contact data".to_string()
        } else {
            have.join(", ")
        };
        println!(
            "  • {} ({}): {}",
            supplier.display_name(),
            supplier.website,
            have
        );
    }
    if report.table.len() > 15 {
        println!("  ... and {} more", report.table.len() - 15);
    }

    println!("\n⏱️  Per-site timings:");
    for timing in &report.timings {
        println!(
            "  • {} ({:.1}s): {}",
            timing.url, timing.seconds, timing.outcome
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_env(
    key: &'static str,
    feature: &'static str,
) -> std::result::Result<String, ConfigError> {
    optional_env(key).ok_or(ConfigError::MissingApiKey { key, feature })
}
