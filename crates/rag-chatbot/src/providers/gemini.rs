//! Gemini streaming client
//!
//! Uses `streamGenerateContent` with server-sent events and concatenates the text parts of
//! every event into the final answer.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;
use super::retry::{AttemptError, RetryPolicy};

/// Gemini API client with automatic retry
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    retry: RetryPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Collects answer text from an SSE byte stream split at arbitrary points
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    text: String,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next network chunk
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&line)?;
        }
        Ok(())
    }

    /// Flush a trailing unterminated line and return the collected text
    pub fn finish(mut self) -> Result<String> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.handle_line(&line)?;
        }
        Ok(self.text)
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(line);
        let Some(data) = line.trim().strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }

        let event: StreamEvent = serde_json::from_str(data)
            .map_err(|e| Error::generation(format!("Malformed Gemini stream event: {}", e)))?;

        for part in event
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
        {
            if let Some(text) = part.text {
                self.text.push_str(&text);
            }
        }
        Ok(())
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, retry: RetryPolicy) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not configured".to_string()));
        }
        Ok(Self {
            client: super::http_client(config.timeout_secs)?,
            config: config.clone(),
            retry,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };
        let (url, request) = (&url, &request);

        tracing::info!("Generating answer with Gemini model: {}", self.config.model);

        let text = self
            .retry
            .run("Gemini generation", || async move {
                let response = self
                    .client
                    .post(url)
                    .header("x-goog-api-key", &self.config.api_key)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::generation(format!("Gemini request failed: {}", e)),
                        )
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(super::generation_failure("Gemini", status, &body));
                }

                let mut accumulator = SseAccumulator::new();
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::generation(format!("Gemini stream interrupted: {}", e)),
                        )
                    })?;
                    accumulator.push(&chunk).map_err(AttemptError::permanent)?;
                }
                accumulator.finish().map_err(AttemptError::permanent)
            })
            .await?;

        if text.trim().is_empty() {
            return Err(Error::generation("Gemini returned an empty answer"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
