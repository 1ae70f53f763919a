//! Mistral adapter (message relevance).
//!
//! Asks the `chat/completions` endpoint whether a message matches the operator's
//! query and maps the one-line verdict to a boolean.

use async_trait::async_trait;
use serde::Serialize;

use tgmon_core::{errors::Error, ports::RelevanceFilter, Result};

pub const DEFAULT_MODEL: &str = "mistral-small-latest";

const ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";

const PROMPT_TEMPLATE: &str = "You are an expert at analyzing Telegram channel messages. \
Your task is to identify and extract messages that are related to a user's query.
Given the user's query and a message, determine if the message is relevant to the query.
Respond with \"RELEVANT\" if the message is related to the query, otherwise respond with \"NOT RELEVANT\".
The user's query is: {user_query}
The message to analyze is: {message_text}";

#[derive(Clone, Debug)]
pub struct MistralClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl MistralClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::External(format!("mistral client build error: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: 10,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("mistral request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "mistral completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("mistral json error: {e}")))?;

        extract_reply(&v)
            .ok_or_else(|| Error::External("mistral completion returned no content".to_string()))
    }
}

#[async_trait]
impl RelevanceFilter for MistralClient {
    async fn is_relevant(&self, text: &str, query: &str) -> Result<bool> {
        let reply = self.complete(&build_prompt(query, text)).await?;
        tracing::info!(reply = reply.trim(), "relevance verdict");
        Ok(parse_relevance(&reply))
    }
}

fn build_prompt(query: &str, text: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{user_query}", query)
        .replace("{message_text}", text)
}

fn extract_reply(v: &serde_json::Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// `NOT RELEVANT` → false, `RELEVANT` → true; anything else is treated as relevant.
pub fn parse_relevance(reply: &str) -> bool {
    let normalized = reply.trim().trim_matches(|c| c == '"' || c == '*').to_uppercase();
    if normalized.starts_with("NOT RELEVANT") {
        return false;
    }
    if !normalized.starts_with("RELEVANT") {
        tracing::warn!(reply, "unexpected relevance reply, keeping message");
    }
    true
}
