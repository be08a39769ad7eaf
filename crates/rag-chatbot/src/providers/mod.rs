//! External service boundaries: embedding models, vector indexes and LLMs
//!
//! Each concern is a trait so the pipeline can be wired with real clients in the server and
//! with in-process fakes in tests. The `build_*` functions pick an implementation from config.

pub mod embedding;
pub mod gemini;
pub mod groq;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod pinecone;
pub mod retry;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use vector_index::VectorIndexProvider;

use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingBackend, IndexBackend, LlmBackend, RagConfig};
use crate::embeddings::OnnxEmbedder;
use crate::error::{Error, Result};

use self::gemini::GeminiClient;
use self::groq::GroqClient;
use self::memory::MemoryIndex;
use self::ollama::OllamaEmbedder;
use self::pinecone::PineconeIndex;
use self::retry::{AttemptError, RetryPolicy};

/// HTTP client shared by the REST providers
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success LLM response: rejected credentials are kept apart from everything else
pub(crate) fn generation_failure(provider: &str, status: StatusCode, body: &str) -> AttemptError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AttemptError::permanent(Error::generation_auth(format!(
            "{} rejected the API key (HTTP {}): {}",
            provider, status, body
        )));
    }
    AttemptError::from_status(
        status,
        Error::generation(format!("{} returned HTTP {}: {}", provider, status, body)),
    )
}

/// Embedding model selected by `embeddings.backend`
pub async fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(&config.embeddings).await?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.embeddings,
            RetryPolicy::from_config(&config.retry),
        )?),
    };
    tracing::info!("Embedding provider: {}", embedder.name());
    Ok(embedder)
}

/// Vector index selected by `index.backend`
pub fn build_index(config: &RagConfig) -> Result<Arc<dyn VectorIndexProvider>> {
    let index: Arc<dyn VectorIndexProvider> = match config.index.backend {
        IndexBackend::Pinecone => Arc::new(PineconeIndex::new(
            &config.index,
            RetryPolicy::from_config(&config.retry),
        )?),
        IndexBackend::Memory => Arc::new(MemoryIndex::new(config.index.dimension)),
    };
    tracing::info!("Vector index: {}", index.name());
    Ok(index)
}

/// Answer generator selected by `llm.provider`
pub fn build_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let retry = RetryPolicy::from_config(&config.retry);
    let llm: Arc<dyn LlmProvider> = match config.llm.provider {
        LlmBackend::Groq => Arc::new(GroqClient::new(&config.llm.groq, retry)?),
        LlmBackend::Gemini => Arc::new(GeminiClient::new(&config.llm.gemini, retry)?),
    };
    tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());
    Ok(llm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationFailure;

    #[test]
    fn test_auth_statuses_are_permanent_auth_failures() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let failure = generation_failure("Groq", status, "invalid key");
            assert!(!failure.transient);
            assert!(matches!(
                failure.error,
                Error::Generation { kind: GenerationFailure::Auth, .. }
            ));
        }
    }

    #[test]
    fn test_rate_limit_is_transient_unexpected() {
        let failure = generation_failure("Gemini", StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(failure.transient);
        assert!(matches!(
            failure.error,
            Error::Generation { kind: GenerationFailure::Unexpected, .. }
        ));

        let failure = generation_failure("Gemini", StatusCode::BAD_REQUEST, "bad prompt");
        assert!(!failure.transient);
    }

    #[test]
    fn test_build_selects_configured_backends() {
        let mut config = RagConfig::default();
        config.index.backend = IndexBackend::Memory;
        config.llm.provider = LlmBackend::Gemini;
        config.llm.gemini.api_key = "gk".into();

        assert_eq!(build_index(&config).unwrap().name(), "memory");
        let llm = build_llm(&config).unwrap();
        assert_eq!(llm.name(), "gemini");
        assert_eq!(llm.model(), "gemini-2.5-flash");

        config.llm.provider = LlmBackend::Groq;
        assert!(build_llm(&config).err().unwrap().is_config());
    }
}
