// src/extract/heuristic.rs
use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::aggregate::normalize_website;
use crate::config::ExtractionConfig;
use crate::models::{PartialSupplier, SourcedField};

/// Link text fragments that mark a contact or about page.
const CONTACT_HREF_HINTS: &[&str] = &[
    "contact",
    "contact-us",
    "contacts",
    "impressum",
    "about",
    "company",
    "reach-us",
];

/// JSON-LD node types whose address we trust.
const JSONLD_ORG_TYPES: &[&str] = &[
    "organization",
    "localbusiness",
    "person",
    "store",
    "corporation",
];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

const MAX_EVIDENCE_SNIPPETS: usize = 8;

/// Pulls contact fields out of one fetched page. Every field extractor
/// is independent: a field that cannot be found stays unset, and a page
/// that yields nothing still produces a valid empty partial.
pub struct HeuristicExtractor {
    cert_patterns: Vec<Regex>,
    max_emails: usize,
    evidence_window: usize,
    email_regex: Regex,
    phone_regex: Regex,
    year_range_regex: Regex,
    street_regex: Regex,
    section_regex: Regex,
    link_selector: Selector,
    jsonld_selector: Selector,
    og_site_selector: Selector,
    title_selector: Selector,
    h1_selector: Selector,
}

impl HeuristicExtractor {
    pub fn new(cert_terms: &[String], config: &ExtractionConfig) -> Self {
        let cert_patterns = cert_terms
            .iter()
            .map(|term| Regex::new(&format!("(?i){}", regex::escape(term))).unwrap())
            .collect();

        Self {
            cert_patterns,
            max_emails: config.max_emails_per_page,
            evidence_window: config.evidence_window,
            email_regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .unwrap(),
            phone_regex: Regex::new(r"\+?\d[\d\s().\-]{6,}\d").unwrap(),
            year_range_regex: Regex::new(r"^(?:19|20)\d{2}\s*[-–]\s*(?:19|20)\d{2}$").unwrap(),
            street_regex: Regex::new(
                r"(?i)\b\d{1,5}[\w/,-]*\s+(?:[A-Za-z0-9&.'-]+\s+){0,6}(?:street|st\.?|road|rd\.?|avenue|ave\.?|boulevard|blvd\.?|lane|ln\.?|drive|dr\.?|estate|area|midc|sector|phase|nagar|marg|park|plaza|zone)\b[^.\n]{0,80}",
            )
            .unwrap(),
            section_regex: Regex::new(
                r"(?i)\b(?:contact|about|address|reach\s*us|registered\s+office|head\s+office)\b",
            )
            .unwrap(),
            link_selector: Selector::parse("a[href]").unwrap(),
            jsonld_selector: Selector::parse(r#"script[type="application/ld+json"]"#).unwrap(),
            og_site_selector: Selector::parse(r#"meta[property="og:site_name"]"#).unwrap(),
            title_selector: Selector::parse("title").unwrap(),
            h1_selector: Selector::parse("h1").unwrap(),
        }
    }

    /// Runs every field extractor over one page. Never fails; fields the
    /// page does not expose just stay unset.
    pub fn extract(&self, url: &str, html: &str) -> PartialSupplier {
        let doc = Html::parse_document(html);
        let text = text_from_doc(&doc);

        let mut partial = PartialSupplier::new(url, 0);
        partial.name = self
            .extract_name(&doc, url)
            .map(SourcedField::heuristic);
        partial.emails = self.extract_emails(&doc, &text);
        partial.phone = self
            .extract_phone(&doc, &text)
            .map(SourcedField::heuristic);
        partial.address = self
            .extract_jsonld_address(&doc)
            .or_else(|| self.extract_address_pattern(&text))
            .map(SourcedField::heuristic);
        partial.certification_evidence = self.extract_cert_evidence(&text);

        debug!(
            "Extracted from {}: {} emails, phone: {}, address: {}, {} evidence snippets",
            url,
            partial.emails.len(),
            partial.phone.is_some(),
            partial.address.is_some(),
            partial.certification_evidence.len()
        );
        partial
    }

    /// Same-site contact/about links worth a follow-up fetch, resolved
    /// against the page URL, first-seen order, capped at `limit`.
    pub fn contact_links(&self, base_url: &str, html: &str, limit: usize) -> Vec<String> {
        let Ok(base) = Url::parse(base_url) else {
            return Vec::new();
        };
        let Some(site) = normalize_website(base_url) else {
            return Vec::new();
        };

        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in doc.select(&self.link_selector) {
            if links.len() >= limit {
                break;
            }
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            let lower = href.to_lowercase();
            if lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.starts_with('#')
            {
                continue;
            }
            if !CONTACT_HREF_HINTS.iter().any(|h| lower.contains(h)) {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            let resolved = resolved.to_string();
            if resolved == base_url || normalize_website(&resolved).as_deref() != Some(site.as_str())
            {
                continue;
            }
            if seen.insert(resolved.clone()) {
                links.push(resolved);
            }
        }

        links
    }

    fn extract_name(&self, doc: &Html, url: &str) -> Option<String> {
        if let Some(meta) = doc.select(&self.og_site_selector).next() {
            if let Some(content) = meta.value().attr("content") {
                let content = content.trim();
                if !content.is_empty() {
                    return Some(content.to_string());
                }
            }
        }

        if let Some(title) = doc.select(&self.title_selector).next() {
            let title: String = title.text().collect();
            let head = title.split(['|', '–']).next().unwrap_or("").trim();
            if !head.is_empty() {
                return Some(head.to_string());
            }
        }

        if let Some(h1) = doc.select(&self.h1_selector).next() {
            let text: String = h1.text().collect();
            let text = collapse_whitespace(&text);
            if text.len() > 2 {
                return Some(text);
            }
        }

        name_from_domain(url)
    }

    fn extract_emails(&self, doc: &Html, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut emails = Vec::new();

        let mut push = |candidate: &str| {
            let candidate = candidate.trim().to_lowercase();
            if IMAGE_EXTENSIONS.iter().any(|ext| candidate.ends_with(ext)) {
                return;
            }
            if !self.email_regex.is_match(&candidate) {
                return;
            }
            if seen.insert(candidate.clone()) {
                emails.push(candidate);
            }
        };

        for element in doc.select(&self.link_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(rest) = href.trim().strip_prefix("mailto:") {
                let address = rest.split(['?', '&']).next().unwrap_or("");
                push(address);
            }
        }

        for m in self.email_regex.find_iter(text) {
            push(m.as_str());
        }

        emails.truncate(self.max_emails);
        emails
    }

    fn extract_phone(&self, doc: &Html, text: &str) -> Option<String> {
        for element in doc.select(&self.link_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(rest) = href.trim().strip_prefix("tel:") {
                let candidate = rest.replace("%20", " ");
                if let Some(phone) = self.plausible_phone(&candidate) {
                    return Some(phone);
                }
            }
        }

        for m in self.phone_regex.find_iter(text) {
            if let Some(phone) = self.plausible_phone(m.as_str()) {
                return Some(phone);
            }
        }
        None
    }

    /// A match counts as a phone when it carries 7 to 15 digits and does
    /// not look like a year range from a copyright line.
    fn plausible_phone(&self, raw: &str) -> Option<String> {
        let cleaned = collapse_whitespace(raw.trim());
        if cleaned.is_empty() || self.year_range_regex.is_match(&cleaned) {
            return None;
        }
        let digits = cleaned.chars().filter(|c| c.is_ascii_digit()).count();
        if (7..=15).contains(&digits) {
            Some(cleaned)
        } else {
            None
        }
    }

    fn extract_jsonld_address(&self, doc: &Html) -> Option<String> {
        for script in doc.select(&self.jsonld_selector) {
            let raw: String = script.text().collect();
            let Ok(data) = serde_json::from_str::<Value>(raw.trim()) else {
                continue;
            };

            let nodes: Vec<&Value> = match &data {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            for node in nodes {
                if let Some(address) = pick_jsonld_address(node) {
                    return Some(address);
                }
                if let Some(graph) = node.get("@graph").and_then(|g| g.as_array()) {
                    for entry in graph {
                        if let Some(address) = pick_jsonld_address(entry) {
                            return Some(address);
                        }
                    }
                }
            }
        }
        None
    }

    /// Fallback when no structured address exists: look for a street-like
    /// pattern, but only near contact/about/address mentions so that
    /// product copy cannot masquerade as an address.
    fn extract_address_pattern(&self, text: &str) -> Option<String> {
        for section in self.section_regex.find_iter(text).take(5) {
            let start = clamp_start(text, section.start().saturating_sub(100));
            let end = clamp_end(text, section.end() + 600);
            if let Some(m) = self.street_regex.find(&text[start..end]) {
                return Some(collapse_whitespace(m.as_str().trim()));
            }
        }
        None
    }

    /// Every certification mention with its surrounding text, in page
    /// order, exact duplicates dropped.
    fn extract_cert_evidence(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<(usize, String)> = Vec::new();
        for pattern in &self.cert_patterns {
            for m in pattern.find_iter(text) {
                let start = clamp_start(text, m.start().saturating_sub(self.evidence_window));
                let end = clamp_end(text, m.end() + self.evidence_window);
                hits.push((m.start(), collapse_whitespace(text[start..end].trim())));
            }
        }
        hits.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        let mut snippets = Vec::new();
        for (_, snippet) in hits {
            if snippets.len() >= MAX_EVIDENCE_SNIPPETS {
                break;
            }
            if seen.insert(snippet.clone()) {
                snippets.push(snippet);
            }
        }
        snippets
    }
}

/// Text content of a page with script/style/noscript stripped and
/// whitespace collapsed, for the text-level extractors and llm prompts.
pub fn visible_text(html: &str) -> String {
    text_from_doc(&Html::parse_document(html))
}

fn text_from_doc(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        if let Some(text) = node.value().as_text() {
            let skipped = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });
            if !skipped {
                out.push_str(text);
                out.push(' ');
            }
        }
    }
    collapse_whitespace(&out)
}

fn pick_jsonld_address(node: &Value) -> Option<String> {
    let node_type = node.get("@type").map(|t| t.to_string().to_lowercase())?;
    if !JSONLD_ORG_TYPES.iter().any(|t| node_type.contains(t)) {
        return None;
    }

    match node.get("address")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(fields) => {
            let parts: Vec<&str> = [
                "streetAddress",
                "addressLocality",
                "addressRegion",
                "postalCode",
                "addressCountry",
            ]
            .iter()
            .filter_map(|key| fields.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

fn name_from_domain(url: &str) -> Option<String> {
    let site = normalize_website(url)?;
    let label = site.split('.').next()?;
    if label.is_empty() {
        return None;
    }
    let words: Vec<String> = label
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clamp_start(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn clamp_end(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;

    fn extractor() -> HeuristicExtractor {
        let config = ExtractionConfig {
            use_llm_extraction: false,
            max_emails_per_page: 5,
            llm_text_limit: 12_000,
            evidence_window: 60,
        };
        HeuristicExtractor::new(
            &["IATF 16949".to_string(), "TS 16949".to_string()],
            &config,
        )
    }

    #[test]
    fn collects_emails_from_mailto_and_text() {
        let html = r#"
            <html><body>
                <a href="mailto:Sales@Acme.com?subject=rfq">write us</a>
                <p>or reach procurement@acme.com for quotes</p>
                <img src="logo@2x.png">
            </body></html>
        "#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(
            partial.emails,
            vec!["sales@acme.com".to_string(), "procurement@acme.com".to_string()]
        );
    }

    #[test]
    fn caps_email_count() {
        let body: String = (0..9)
            .map(|i| format!("<p>dept{i}@acme.com</p>"))
            .collect();
        let partial = extractor().extract("https://acme.com", &format!("<body>{body}</body>"));
        assert_eq!(partial.emails.len(), 5);
    }

    #[test]
    fn empty_page_yields_empty_partial_without_name_sources() {
        let partial = extractor().extract("https://acme.com", "<html><body></body></html>");
        assert!(partial.emails.is_empty());
        assert!(partial.phone.is_none());
        assert!(partial.address.is_none());
        assert!(partial.certification_evidence.is_empty());
        // the domain still names the record
        assert_eq!(partial.name.unwrap().value, "Acme");
    }

    #[test]
    fn first_plausible_phone_wins_and_year_ranges_lose() {
        let html = r#"
            <body>
                <footer>© 2010 - 2024 Acme</footer>
                <p>Call +91 20 2712 3456 or 020-27123457</p>
            </body>
        "#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(partial.phone.unwrap().value, "+91 20 2712 3456");
    }

    #[test]
    fn tel_link_beats_text_scan() {
        let html = r#"<body><a href="tel:+912027123456">call</a><p>+91 11 9999 8888</p></body>"#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(partial.phone.unwrap().value, "+912027123456");
    }

    #[test]
    fn jsonld_address_is_preferred() {
        let html = r#"
            <head><script type="application/ld+json">
                {"@type": "Organization", "name": "Acme",
                 "address": {"streetAddress": "Plot 12, MIDC", "addressLocality": "Pune",
                             "postalCode": "411019", "addressCountry": "IN"}}
            </script></head>
            <body><p>Contact: 88 Industrial Road, Pune</p></body>
        "#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(
            partial.address.unwrap().value,
            "Plot 12, MIDC, Pune, 411019, IN"
        );
    }

    #[test]
    fn jsonld_graph_and_string_addresses_work() {
        let html = r#"
            <script type="application/ld+json">
                {"@graph": [{"@type": "LocalBusiness", "address": "5 Park Lane, Leeds"}]}
            </script>
        "#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(partial.address.unwrap().value, "5 Park Lane, Leeds");
    }

    #[test]
    fn pattern_address_needs_a_contact_section() {
        let with_section = r#"
            <body><h2>Contact us</h2><p>88 Industrial Estate Phase 2, Pune 411019</p></body>
        "#;
        let partial = extractor().extract("https://acme.com", with_section);
        let address = partial.address.unwrap().value;
        assert!(address.starts_with("88 Industrial Estate"));

        let without_section = r#"
            <body><p>We shipped 88 Industrial Estate Phase 2 units last year</p></body>
        "#;
        let partial = extractor().extract("https://acme.com", without_section);
        assert!(partial.address.is_none());
    }

    #[test]
    fn duplicate_evidence_collapses_distinct_contexts_remain() {
        // identical boilerplate repeated far apart gives byte-identical
        // windows; a mention in fresh context gives a second snippet
        let padding = "padding ".repeat(12);
        let boilerplate = "Quality: We are IATF 16949 certified at this plant site now.";
        let html = format!(
            "<body><p>{padding}</p><p>{boilerplate}</p><p>{padding}</p>\
             <p>{boilerplate}</p><p>{padding}</p>\
             <p>Our Chennai plant renewed its IATF 16949 audit in 2023.</p></body>"
        );
        let evidence = extractor()
            .extract("https://acme.com", &html)
            .certification_evidence;
        assert_eq!(evidence.len(), 2);
        assert!(evidence[0].contains("certified at this plant"));
        assert!(evidence[1].contains("Chennai plant"));
    }

    #[test]
    fn evidence_matches_synonym_terms() {
        let html = "<body><p>Certified to TS 16949 standards.</p></body>";
        let evidence = extractor()
            .extract("https://acme.com", html)
            .certification_evidence;
        assert_eq!(evidence.len(), 1);
        assert!(evidence[0].contains("TS 16949"));
    }

    #[test]
    fn name_prefers_og_site_name_then_title() {
        let html = r#"
            <head>
                <meta property="og:site_name" content="Acme Gaskets Pvt Ltd">
                <title>Home | Acme</title>
            </head>
        "#;
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(partial.name.unwrap().value, "Acme Gaskets Pvt Ltd");

        let html = "<head><title>Acme Gaskets – Precision Parts</title></head>";
        let partial = extractor().extract("https://acme.com", html);
        assert_eq!(partial.name.unwrap().value, "Acme Gaskets");
    }

    #[test]
    fn domain_fallback_title_cases_labels() {
        let partial = extractor().extract("https://www.acme-gaskets.com/", "<body></body>");
        assert_eq!(partial.name.unwrap().value, "Acme Gaskets");
    }

    #[test]
    fn contact_links_stay_on_site_and_dedup() {
        let html = r#"
            <body>
                <a href="/contact-us">Contact</a>
                <a href="/contact-us">Contact again</a>
                <a href="https://acme.com/about">About</a>
                <a href="https://linkedin.com/company/acme">LinkedIn</a>
                <a href="mailto:x@acme.com">mail</a>
                <a href="/products">Products</a>
            </body>
        "#;
        let links = extractor().contact_links("https://acme.com/", html, 3);
        assert_eq!(
            links,
            vec![
                "https://acme.com/contact-us".to_string(),
                "https://acme.com/about".to_string(),
            ]
        );
    }

    #[test]
    fn contact_links_honor_the_cap() {
        let html = r#"
            <body>
                <a href="/contact">1</a>
                <a href="/about">2</a>
                <a href="/company">3</a>
            </body>
        "#;
        let links = extractor().contact_links("https://acme.com/", html, 2);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn visible_text_skips_script_and_style() {
        let html = r#"
            <head><style>body { color: red }</style></head>
            <body><script>var x = "hidden@nowhere.com";</script><p>Hello   world</p></body>
        "#;
        let text = visible_text(html);
        assert_eq!(text, "Hello world");
    }
}
