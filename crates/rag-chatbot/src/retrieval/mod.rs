//! Vector store access and grounded question answering

pub mod orchestrator;
pub mod vector_store;

pub use orchestrator::AnswerOrchestrator;
pub use vector_store::VectorStoreClient;
