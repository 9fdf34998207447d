// src/cli/check_environment.rs
use crate::models::{CliApp, Result};

impl CliApp {
    pub async fn check_environment(&self) -> Result<()> {
        println!("\n🔧 Environment Check");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        print_key("SERPAPI_API_KEY", "web search", true);
        print_key("OPENAI_API_KEY", "LLM domain filter and extraction", false);
        print_key("HUNTER_API_KEY", "email enrichment", false);

        println!("\n⚙️  Active configuration:");
        println!(
            "  • search: max {} results, LLM domain filter {}",
            self.config.search.default_max_results,
            on_off(self.config.search.use_llm_domain_filter)
        );
        println!(
            "  • fetch: {}s timeout, {} parallel, {} contact page(s) per site",
            self.config.fetch.timeout_seconds,
            self.config.fetch.parallel_fetches,
            self.config.fetch.max_contact_pages
        );
        println!(
            "  • extraction: LLM fallback {}, {} emails per page, {} char evidence window",
            on_off(self.config.extraction.use_llm_extraction),
            self.config.extraction.max_emails_per_page,
            self.config.extraction.evidence_window
        );
        println!(
            "  • enrichment: up to {} emails per supplier, {} parallel, {}ms delay",
            self.config.enrichment.email_limit,
            self.config.enrichment.parallel_requests,
            self.config.enrichment.delay_ms
        );
        println!("  • output directory: {}", self.config.output.directory);

        Ok(())
    }
}

fn print_key(key: &str, feature: &str, required: bool) {
    let set = std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    let status = match (set, required) {
        (true, _) => "✅ set",
        (false, true) => "❌ missing (required)",
        (false, false) => "⚠️  not set (optional)",
    };
    println!("  {status}: {key} ({feature})");
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
