//! In-process vector index
//!
//! Cosine similarity over every stored vector in the namespace. Nothing survives a restart,
//! which makes it suitable for local runs and tests only.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::types::{EmbeddedChunk, ScoredMatch, VectorMetadata};

use super::vector_index::VectorIndexProvider;

struct StoredVector {
    vector: Vec<f32>,
    metadata: VectorMetadata,
}

/// Namespaced in-memory index keyed by `(namespace, id)`
pub struct MemoryIndex {
    dimension: usize,
    vectors: DashMap<(String, String), StoredVector>,
}

impl MemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: DashMap::new(),
        }
    }

    /// Number of vectors stored in `namespace`
    pub fn len(&self, namespace: &str) -> usize {
        self.vectors.iter().filter(|e| e.key().0 == namespace).count()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndexProvider for MemoryIndex {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, vectors: &[EmbeddedChunk], namespace: &str) -> Result<usize> {
        if let Some(bad) = vectors.iter().find(|v| v.vector.len() != self.dimension) {
            return Err(Error::IndexWrite(format!(
                "Vector '{}' has dimension {}, index expects {}",
                bad.id,
                bad.vector.len(),
                self.dimension
            )));
        }

        for v in vectors {
            self.vectors.insert(
                (namespace.to_string(), v.id.clone()),
                StoredVector {
                    vector: v.vector.clone(),
                    metadata: v.metadata.clone(),
                },
            );
        }
        Ok(vectors.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>> {
        if vector.len() != self.dimension {
            return Err(Error::IndexQuery(format!(
                "Query vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut matches: Vec<ScoredMatch> = self
            .vectors
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .map(|entry| ScoredMatch {
                vector_id: entry.key().1.clone(),
                score: cosine_similarity(vector, &entry.value().vector),
                metadata: if include_metadata {
                    entry.value().metadata.clone()
                } else {
                    VectorMetadata::default()
                },
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.vector_id.cmp(&b.vector_id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
