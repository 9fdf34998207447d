// src/errors.rs
use std::time::Duration;

use thiserror::Error;

/// Problems detected before any network call: bad user input, unreadable
/// config file, or a missing credential for a requested feature.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("max results must be at least 1")]
    InvalidMaxResults,

    #[error("{key} is not set ({feature} needs it)")]
    MissingApiKey {
        key: &'static str,
        feature: &'static str,
    },

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Search provider failures. Fatal for the run: without at least one
/// successful query there is nothing to discover.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider rejected the request (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("all {0} search queries failed")]
    AllQueriesFailed(usize),
}

/// Per-URL fetch failures. Recoverable: the candidate is dropped and the
/// run continues with the remaining sites.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("http status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(reqwest::Error),
}

// Extraction carries no error type: every field extractor degrades to
// "unset" instead of failing, so a page that yields nothing still yields
// a valid (empty) partial record.

/// LLM assist failures. Recoverable: the run keeps the heuristic result
/// and degrades silently.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Provider(#[from] async_openai::error::OpenAIError),

    #[error("llm returned an unusable response: {0}")]
    Malformed(String),
}

/// Email enrichment failures. Recoverable: the supplier keeps whatever
/// emails extraction already found.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("enrichment request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("enrichment provider rejected the request (status {0})")]
    Provider(u16),
}

/// Export failures. Fatal for the export step only; the in-memory result
/// table stays valid and can be re-exported.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook serialization failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("could not write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// The fatal paths of a discovery run. Recoverable errors (fetch, llm,
/// enrichment) never reach this type; they are logged and counted in the
/// run report instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Search(#[from] SearchError),
}
