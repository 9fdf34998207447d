// src/extract/mod.rs
pub mod heuristic;
pub mod llm_assist;

// Re-export main types for convenience
pub use heuristic::{visible_text, HeuristicExtractor};
pub use llm_assist::{LlmAssist, LlmContact, OpenAiAssist};
