//! Groq chat-completions client
//!
//! Groq exposes an OpenAI-compatible endpoint; the prompt goes in as a single user message.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GroqConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;
use super::retry::{AttemptError, RetryPolicy};

/// Groq API client with automatic retry
pub struct GroqClient {
    client: Client,
    config: GroqConfig,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::generation("Groq returned no completion text"))
    }
}

impl GroqClient {
    pub fn new(config: &GroqConfig, retry: RetryPolicy) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("GROQ_API_KEY is not configured".to_string()));
        }
        Ok(Self {
            client: super::http_client(config.timeout_secs)?,
            config: config.clone(),
            retry,
        })
    }
}

#[async_trait]
impl LlmProvider for GroqClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let (url, request) = (&url, &request);

        tracing::info!("Generating answer with Groq model: {}", self.config.model);

        let response: ChatResponse = self
            .retry
            .run("Groq chat completion", || async move {
                let response = self
                    .client
                    .post(url)
                    .bearer_auth(&self.config.api_key)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::generation(format!("Groq request failed: {}", e)),
                        )
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(super::generation_failure("Groq", status, &body));
                }

                response.json().await.map_err(|e| {
                    AttemptError::permanent(Error::generation(format!(
                        "Failed to parse Groq response: {}",
                        e
                    )))
                })
            })
            .await?;

        response.into_text()
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
