//! Turns chunks into unit-length vectors ready for the index

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{EmbeddingConfig, IdStrategy};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, EmbeddedChunk, VectorMetadata};

/// Batches chunk text through an [`EmbeddingProvider`] and assigns vector ids
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    id_strategy: IdStrategy,
    query_prefix: String,
    passage_prefix: String,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self {
            provider,
            batch_size: config.batch_size.max(1),
            id_strategy: config.id_strategy,
            query_prefix: config.query_prefix.clone(),
            passage_prefix: config.passage_prefix.clone(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed every non-blank chunk, preserving input order
    ///
    /// Fails with [`Error::NoChunksToEmbed`] before calling the provider if every chunk is blank.
    pub async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddedChunk>> {
        let valid: Vec<&Chunk> = chunks.iter().filter(|c| !c.text.trim().is_empty()).collect();
        if valid.is_empty() {
            return Err(Error::NoChunksToEmbed);
        }
        if valid.len() < chunks.len() {
            tracing::debug!("Dropped {} blank chunks", chunks.len() - valid.len());
        }

        let total_batches = valid.len().div_ceil(self.batch_size);
        let mut embedded = Vec::with_capacity(valid.len());
        let mut occurrences: HashMap<String, u32> = HashMap::new();

        for (batch_idx, batch) in valid.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch
                .iter()
                .map(|c| format!("{}{}", self.passage_prefix, c.text))
                .collect();

            let vectors = self.encode(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                let vector = self.checked_unit(vector)?;
                let id = match self.id_strategy {
                    IdStrategy::Random => Uuid::new_v4().to_string(),
                    IdStrategy::ContentHash => {
                        let base = content_hash(chunk, 0);
                        let seen = occurrences.entry(base.clone()).or_insert(0);
                        let id = if *seen == 0 { base } else { content_hash(chunk, *seen) };
                        *seen += 1;
                        id
                    }
                };

                embedded.push(EmbeddedChunk {
                    id,
                    vector,
                    metadata: VectorMetadata::from(*chunk),
                    raw_text: chunk.text.clone(),
                });
            }

            tracing::debug!("Embedded batch {}/{}", batch_idx + 1, total_batches);
        }

        tracing::info!(
            "Created {} embeddings with {} in {} batch(es)",
            embedded.len(),
            self.provider.name(),
            total_batches
        );

        Ok(embedded)
    }

    /// Embed a question for retrieval
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let text = format!("{}{}", self.query_prefix, query);
        let vector = self
            .encode(std::slice::from_ref(&text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Provider returned no vector for the query"))?;
        self.checked_unit(vector)
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.provider.embed_batch(texts).await.map_err(|e| match e {
            Error::Embedding(_) => e,
            other => Error::embedding(other.to_string()),
        })
    }

    fn checked_unit(&self, vector: Vec<f32>) -> Result<Vec<f32>> {
        let expected = self.provider.dimensions();
        if vector.len() != expected {
            return Err(Error::embedding(format!(
                "Vector has {} dimensions, expected {}",
                vector.len(),
                expected
            )));
        }
        normalize(vector)
    }
}

/// Scale to unit L2 norm
pub fn normalize(mut vector: Vec<f32>) -> Result<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(Error::embedding("Cannot normalize a zero or non-finite vector"));
    }
    for value in &mut vector {
        *value /= norm;
    }
    Ok(vector)
}

/// Stable id from where the text came from and what it says
fn content_hash(chunk: &Chunk, occurrence: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.metadata.source_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.metadata.page_number.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.text.as_bytes());
    if occurrence > 0 {
        hasher.update([0u8]);
        hasher.update(occurrence.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}
