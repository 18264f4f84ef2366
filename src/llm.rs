//! Chat-completions client used to generate replies.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. One request
//! per reply, no streaming and no retries.

use crate::config::Settings;
use crate::http::{build_client, check_response_status, map_reqwest_error};
use crate::{DemoError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Build the message list for one reply: system blocks, then each
/// `(user, assistant)` pair, then the new user message.
pub fn build_messages(
    system_blocks: &[&str],
    history: &[(String, String)],
    message: &str,
) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = system_blocks
        .iter()
        .map(|block| ChatMessage::system(*block))
        .collect();
    for (user, assistant) in history {
        messages.push(ChatMessage::user(user.as_str()));
        messages.push(ChatMessage::assistant(assistant.as_str()));
    }
    messages.push(ChatMessage::user(message));
    messages
}

/// Language-model client
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: settings.llm_base_url.trim_end_matches('/').to_string(),
            api_key: settings.openai_api_key.trim().to_string(),
            model: settings.llm_model.clone(),
            temperature: settings.llm_temperature,
        })
    }

    /// Generate a reply for the given messages.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Calling LLM {} with {} messages",
            self.model,
            messages.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let response = check_response_status(response).await?;

        let chat_response: ChatResponse = response.json().await.map_err(map_reqwest_error)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DemoError::Remote("LLM returned no choices".to_string()))
    }
}
