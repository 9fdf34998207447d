// src/models.rs
use serde::{Deserialize, Serialize};

use crate::{config::Config, pipeline::RunReport};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub const DEFAULT_MAX_RESULTS: usize = 20;

/// One discovery request as entered by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub commodity: String,
    pub region: String,
    pub certification: String,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn new(commodity: &str, region: &str, certification: &str) -> Self {
        Self {
            commodity: commodity.trim().to_string(),
            region: region.trim().to_string(),
            certification: certification.trim().to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// A single organic search hit, in the order the provider returned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Which extraction path produced a field value. Ordering matters for
/// merges: a later variant outranks an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Heuristic,
    Llm,
    Enrichment,
}

/// A scalar field value together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedField {
    pub value: String,
    pub provenance: Provenance,
}

impl SourcedField {
    pub fn heuristic(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            provenance: Provenance::Heuristic,
        }
    }

    pub fn llm(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            provenance: Provenance::Llm,
        }
    }
}

/// Everything one page yielded for one site. Several of these per site
/// (homepage, contact pages, llm assist) are merged during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSupplier {
    pub source_url: String,
    pub rank: usize,
    pub name: Option<SourcedField>,
    pub address: Option<SourcedField>,
    pub phone: Option<SourcedField>,
    pub emails: Vec<String>,
    pub certification_evidence: Vec<String>,
}

impl PartialSupplier {
    pub fn new(source_url: &str, rank: usize) -> Self {
        Self {
            source_url: source_url.to_string(),
            rank,
            name: None,
            address: None,
            phone: None,
            emails: Vec::new(),
            certification_evidence: Vec::new(),
        }
    }

    /// True when no extractor found anything worth keeping.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.emails.is_empty()
            && self.certification_evidence.is_empty()
    }
}

/// One deduplicated supplier, keyed by normalized website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub website: String,
    pub name: Option<SourcedField>,
    pub address: Option<SourcedField>,
    pub phone: Option<SourcedField>,
    pub emails: Vec<String>,
    pub certification_evidence: Vec<String>,
    /// Lowest search rank among the pages that contributed to this record.
    pub first_rank: usize,
}

impl Supplier {
    /// Company name for display and export, falling back to the website
    /// when no extractor produced one.
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .map(|n| n.value.as_str())
            .unwrap_or(self.website.as_str())
    }
}

/// Final output of a run: deduplicated suppliers in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub suppliers: Vec<Supplier>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }
}

pub struct CliApp {
    pub config: Config,
    pub last_run: tokio::sync::Mutex<Option<RunReport>>,
}
