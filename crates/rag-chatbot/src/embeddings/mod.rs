//! Embedding generation
//!
//! [`EmbeddingGenerator`] owns batching, normalization and id assignment; the model behind it
//! is any [`crate::providers::EmbeddingProvider`].

pub mod generator;
pub mod onnx;

pub use generator::{normalize, EmbeddingGenerator};
pub use onnx::OnnxEmbedder;
