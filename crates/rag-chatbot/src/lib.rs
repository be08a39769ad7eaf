//! rag-chatbot: document Q&A over a managed vector index
//!
//! Documents (PDF, TXT, DOCX and scanned images) are extracted page by page, split into
//! overlapping chunks, embedded, and upserted into a namespaced vector index. Questions are
//! answered by retrieving the closest chunks above a relevance threshold and asking an LLM to
//! answer strictly from them, with a fixed fallback when nothing relevant is found.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{APOLOGY_MESSAGE, FALLBACK_MESSAGE};
pub use types::{
    document::{Chunk, ChunkMetadata, FileType, PageRecord},
    query::QueryRequest,
    response::{AnswerResult, AnswerStatus, QueryResponse},
    vector::{EmbeddedChunk, ScoredMatch, VectorMetadata},
};
