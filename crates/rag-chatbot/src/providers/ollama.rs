//! Ollama embedding client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::retry::{AttemptError, RetryPolicy};

/// Embeds text through a local Ollama server
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: super::http_client(60)?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            dimensions: config.dimensions,
            retry,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let (url, request) = (&url, &request);

        let response: EmbedResponse = self
            .retry
            .run("Ollama embedding", || async move {
                let response = self
                    .client
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| {
                        AttemptError::from_transport(
                            &e,
                            Error::embedding(format!("Embedding request failed: {}", e)),
                        )
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AttemptError::from_status(
                        status,
                        Error::embedding(format!("Embedding failed: HTTP {} - {}", status, body)),
                    ));
                }

                response.json().await.map_err(|e| {
                    AttemptError::permanent(Error::embedding(format!(
                        "Failed to parse embedding response: {}",
                        e
                    )))
                })
            })
            .await?;

        if response.embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                response.embedding.len(),
                self.dimensions
            )));
        }

        Ok(response.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
