// src/search/query_builder.rs
use crate::errors::ConfigError;
use crate::models::SearchQuery;

/// Marketplace and directory domains that never count as supplier sites.
/// Kept as suffixes so subdomains match too.
pub const AGGREGATOR_BLACKLIST: &[&str] = &[
    "indiamart.com",
    "alibaba.com",
    "aliexpress.com",
    "1688.com",
    "made-in-china.com",
    "globalsources.com",
    "tradeindia.com",
    "exportersindia.com",
    "justdial.com",
    "yellowpages.com",
    "yellowpages.in",
    "yelp.com",
    "thomasnet.com",
    "amazon.com",
    "amazon.in",
    "amazon.co.in",
    "ebay.com",
    "ebay.in",
    "facebook.com",
    "linkedin.com",
    "instagram.com",
    "wikipedia.org",
    "wikimedia.org",
    "google.com",
];

/// Words that mark a search hit as a probable supplier page.
pub const SUPPLIER_HINT_WORDS: &[&str] = &[
    "supplier",
    "manufacturer",
    "distributor",
    "fabricator",
    "oem",
    "factory",
    "exporter",
    "wholesaler",
    "vendor",
    "machining",
    "stamping",
    "molding",
    "casting",
    "tooling",
    "die casting",
    "injection molding",
    "cnc",
    "sheet metal",
    "foundry",
];

/// Alternate spellings and predecessor names for common certifications.
const CERT_SYNONYMS: &[(&str, &[&str])] = &[
    ("IATF 16949", &["IATF 16949", "TS 16949"]),
    ("ISO 9001", &["ISO9001", "ISO 9001", "ISO-9001"]),
    ("ISO 13485", &["ISO 13485", "ISO13485"]),
    ("ISO 14001", &["ISO 14001", "ISO-14001", "ISO14001"]),
    ("ISO 45001", &["ISO 45001", "ISO45001", "OHSAS 18001"]),
    ("RoHS", &["RoHS", "Restriction of Hazardous Substances"]),
    (
        "REACH",
        &[
            "REACH",
            "Registration, Evaluation, Authorisation and Restriction of Chemicals",
        ],
    ),
    ("FDA", &["FDA", "Food and Drug Administration"]),
    ("CE", &["CE", "CE Marking"]),
];

/// Role words appended to the base query, one search string each.
const ROLE_VARIANTS: &[&str] = &["supplier", "manufacturer", "OEM", "factory", "distributor"];

/// Expands a query into the fixed set of provider search strings. The
/// expansion is deterministic: same input, same strings, same order.
pub fn build_queries(query: &SearchQuery) -> Result<Vec<String>, ConfigError> {
    validate(query)?;

    let commodity = query.commodity.trim();
    let region = query.region.trim();
    let certification = query.certification.trim();
    let negative = negative_site_clause();

    let queries = ROLE_VARIANTS
        .iter()
        .map(|role| format!("\"{commodity}\" {region} \"{certification}\" {role}{negative}"))
        .collect();

    Ok(queries)
}

fn validate(query: &SearchQuery) -> Result<(), ConfigError> {
    if query.commodity.trim().is_empty() {
        return Err(ConfigError::EmptyField("commodity"));
    }
    if query.region.trim().is_empty() {
        return Err(ConfigError::EmptyField("region"));
    }
    if query.certification.trim().is_empty() {
        return Err(ConfigError::EmptyField("certification"));
    }
    if query.max_results == 0 {
        return Err(ConfigError::InvalidMaxResults);
    }
    Ok(())
}

fn negative_site_clause() -> String {
    let clauses: Vec<String> = AGGREGATOR_BLACKLIST
        .iter()
        .map(|d| format!("-site:{d}"))
        .collect();
    format!(" {}", clauses.join(" "))
}

/// The certification plus every known synonym, original casing kept,
/// first-seen order, no duplicates.
pub fn compile_cert_terms(certification: &str) -> Vec<String> {
    let needle = certification.trim().to_lowercase();
    let mut terms = vec![certification.trim().to_string()];

    for (canonical, synonyms) in CERT_SYNONYMS {
        let haystack = synonyms.join(" ").to_lowercase();
        if canonical.to_lowercase().contains(&needle) || haystack.contains(&needle) {
            for syn in *synonyms {
                terms.push(syn.to_string());
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    terms.retain(|t| seen.insert(t.to_lowercase()));
    terms
}

/// Suffix match so `dir.indiamart.com` is caught by `indiamart.com`.
pub fn is_blacklisted_domain(domain: &str) -> bool {
    let domain = domain.to_lowercase();
    AGGREGATOR_BLACKLIST
        .iter()
        .any(|b| domain == *b || domain.ends_with(&format!(".{b}")))
}

pub fn is_likely_supplier_result(title: &str, snippet: &str) -> bool {
    let title = title.to_lowercase();
    let snippet = snippet.to_lowercase();
    SUPPLIER_HINT_WORDS
        .iter()
        .any(|w| title.contains(w) || snippet.contains(w))
}
