//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;
pub mod vector;

pub use document::{Chunk, ChunkMetadata, FileType, PageRecord};
pub use query::QueryRequest;
pub use response::{
    AnswerResult, AnswerStatus, IngestResponse, IngestSummary, QueryResponse, SkippedFile,
};
pub use vector::{EmbeddedChunk, ScoredMatch, VectorMetadata};
