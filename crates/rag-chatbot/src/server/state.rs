//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::embeddings::EmbeddingGenerator;
use crate::error::Result;
use crate::ingestion::{DocumentParser, IngestPipeline, OcrEngine, TextChunker};
use crate::providers::{self, EmbeddingProvider, LlmProvider, VectorIndexProvider};
use crate::retrieval::{AnswerOrchestrator, VectorStoreClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    pipeline: IngestPipeline,
    orchestrator: AnswerOrchestrator,
}

impl AppState {
    /// Build every provider from configuration and make sure the index exists
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let embedder = providers::build_embedder(&config).await?;
        let index = providers::build_index(&config)?;
        let llm = providers::build_llm(&config)?;

        index.ensure_index().await?;
        tracing::info!(
            "Vector index ready (namespace '{}')",
            config.index.namespace
        );

        Self::from_parts(config, embedder, index, llm)
    }

    /// Wire the pipeline around already constructed providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let parser = Arc::new(DocumentParser::new(OcrEngine::new(&config.ocr)));
        let chunker = TextChunker::new(&config.chunking)?;
        let embeddings = Arc::new(EmbeddingGenerator::new(embedder, &config.embeddings));
        let store = Arc::new(VectorStoreClient::new(
            index,
            config.index.namespace.clone(),
            config.index.batch_size,
        ));

        let pipeline = IngestPipeline::new(parser, chunker, Arc::clone(&embeddings), Arc::clone(&store));
        let orchestrator = AnswerOrchestrator::new(embeddings, store, llm);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                orchestrator,
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn orchestrator(&self) -> &AnswerOrchestrator {
        &self.inner.orchestrator
    }
}
