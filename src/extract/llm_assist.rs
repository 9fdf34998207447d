// src/extract/llm_assist.rs
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::LlmError;
use crate::models::SearchQuery;

const ASSIST_MODEL: &str = "gpt-4o-mini";
const MAX_LLM_EMAILS: usize = 5;

/// Structured contact fields the assist model returns for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmContact {
    pub company_name: Option<String>,
    pub address_best: Option<String>,
    pub phone_best: Option<String>,
    pub emails: Vec<String>,
}

/// Optional LLM help: structured contact extraction for pages the
/// heuristics could not crack, and a company-vs-marketplace call on
/// search hits. Both degrade silently when the provider misbehaves.
#[async_trait]
pub trait LlmAssist: Send + Sync {
    async fn extract_contact(&self, page_text: &str, region: &str)
        -> Result<LlmContact, LlmError>;

    async fn is_company_domain(
        &self,
        domain: &str,
        title: &str,
        snippet: &str,
        query: &SearchQuery,
    ) -> Result<bool, LlmError>;
}

pub struct OpenAiAssist {
    client: Client<OpenAIConfig>,
    text_limit: usize,
}

impl OpenAiAssist {
    pub fn new(api_key: String, text_limit: usize) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            text_limit,
        }
    }
}

#[async_trait]
impl LlmAssist for OpenAiAssist {
    async fn extract_contact(
        &self,
        page_text: &str,
        region: &str,
    ) -> Result<LlmContact, LlmError> {
        let snippet: String = page_text.chars().take(self.text_limit).collect();
        let prompt = format!(
            "You extract precise contact data from messy page text for a supplier in region \"{region}\".\n\
             \n\
             Return JSON with:\n\
             - company_name: string\n\
             - address_best: single string (prefer HQ/factory address in the specified region)\n\
             - phones_best: single string (best phone for the specified region; else main switchboard)\n\
             - emails: list of unique emails (max {MAX_LLM_EMAILS}), drop images/obfuscated text\n\
             \n\
             TEXT START\n\
             {snippet}\n\
             TEXT END"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(ASSIST_MODEL)
            .temperature(0.2)
            .response_format(ResponseFormat::JsonObject)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::Malformed("completion had no content".to_string()))?;

        let contact = parse_contact(&content)?;
        debug!(
            "LLM assist returned name: {}, address: {}, {} emails",
            contact.company_name.is_some(),
            contact.address_best.is_some(),
            contact.emails.len()
        );
        Ok(contact)
    }

    async fn is_company_domain(
        &self,
        domain: &str,
        title: &str,
        snippet: &str,
        query: &SearchQuery,
    ) -> Result<bool, LlmError> {
        let prompt = format!(
            "Classify the website as either \"company\" or \"marketplace\".\n\
             - Treat directories, listings, B2B marketplaces, comparison portals, social networks, job boards as \"marketplace\".\n\
             - We want manufacturer/company sites related to commodity '{}', region '{}', certification '{}'.\n\
             \n\
             Given:\n\
             title: {title}\n\
             snippet: {snippet}\n\
             domain: {domain}\n\
             \n\
             Answer with a single word: company or marketplace",
            query.commodity, query.region, query.certification
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(ASSIST_MODEL)
            .temperature(0.0)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(classify_answer(&answer))
    }
}

/// Tolerant parse of the model's JSON: missing keys, nulls and stray
/// types all degrade to unset fields instead of an error.
fn parse_contact(content: &str) -> Result<LlmContact, LlmError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| LlmError::Malformed(e.to_string()))?;

    let get_str = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s.to_lowercase() != "null")
    };

    let mut emails: Vec<String> = value
        .get("emails")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| s.contains('@'))
                .collect()
        })
        .unwrap_or_default();
    emails.dedup();
    emails.truncate(MAX_LLM_EMAILS);

    Ok(LlmContact {
        company_name: get_str("company_name"),
        address_best: get_str("address_best"),
        phone_best: get_str("phones_best").or_else(|| get_str("phone_best")),
        emails,
    })
}

fn classify_answer(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.contains("company") && !answer.contains("marketplace")
}
