//! Vector index provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{EmbeddedChunk, ScoredMatch};

/// Trait for a namespaced similarity index
///
/// Implementations:
/// - `PineconeIndex`: Pinecone serverless index over REST
/// - `MemoryIndex`: in-process cosine index
///
/// Ids are primary keys: upserting an existing id replaces it.
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Create the index if it does not exist yet
    async fn ensure_index(&self) -> Result<()>;

    /// Write one batch of vectors, returning how many the index accepted
    async fn upsert(&self, vectors: &[EmbeddedChunk], namespace: &str) -> Result<usize>;

    /// Nearest neighbours by the index metric, best first
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>>;

    /// Check if the index is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
