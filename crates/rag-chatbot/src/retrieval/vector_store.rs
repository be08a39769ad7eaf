//! Namespaced, batched access to the vector index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::VectorIndexProvider;
use crate::types::{EmbeddedChunk, ScoredMatch};

/// Vector store client bound to one namespace
pub struct VectorStoreClient {
    index: Arc<dyn VectorIndexProvider>,
    namespace: String,
    batch_size: usize,
}

impl VectorStoreClient {
    pub fn new(index: Arc<dyn VectorIndexProvider>, namespace: impl Into<String>, batch_size: usize) -> Self {
        Self {
            index,
            namespace: namespace.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the underlying index if needed
    pub async fn ensure_index(&self) -> Result<()> {
        self.index.ensure_index().await
    }

    /// Write all vectors in order, one index call per batch
    ///
    /// Stops at the first failed batch; batches written before it stay in the index.
    pub async fn upsert(&self, vectors: &[EmbeddedChunk]) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let total_batches = vectors.len().div_ceil(self.batch_size);
        let mut written = 0usize;

        for (i, batch) in vectors.chunks(self.batch_size).enumerate() {
            let accepted = self
                .index
                .upsert(batch, &self.namespace)
                .await
                .map_err(|e| {
                    let message = match e {
                        Error::IndexWrite(msg) => msg,
                        other => other.to_string(),
                    };
                    Error::IndexWrite(format!("batch {}/{}: {}", i + 1, total_batches, message))
                })?;

            if accepted != batch.len() {
                tracing::warn!(
                    "Index accepted {} of {} vectors in batch {}/{}",
                    accepted,
                    batch.len(),
                    i + 1,
                    total_batches
                );
            }
            written += batch.len();
            tracing::debug!("Upserted batch {}/{} ({} vectors)", i + 1, total_batches, batch.len());
        }

        tracing::info!(
            "Stored {} vectors in namespace '{}' via {}",
            written,
            self.namespace,
            self.index.name()
        );

        Ok(written)
    }

    /// Nearest neighbours at or above `min_score`, best first
    pub async fn query(&self, vector: &[f32], top_k: usize, min_score: f32) -> Result<Vec<ScoredMatch>> {
        let matches = self
            .index
            .query(vector, top_k, &self.namespace, true)
            .await
            .map_err(|e| match e {
                Error::IndexQuery(_) => e,
                other => Error::IndexQuery(other.to_string()),
            })?;

        let returned = matches.len();
        let kept: Vec<ScoredMatch> = matches.into_iter().filter(|m| m.score >= min_score).collect();

        tracing::debug!(
            "Query returned {} matches, {} at or above {:.2}",
            returned,
            kept.len(),
            min_score
        );

        Ok(kept)
    }
}
