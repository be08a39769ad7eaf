//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why answer generation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFailure {
    /// The LLM rejected our credentials (HTTP 401/403)
    Auth,
    /// Anything else: transport, quota, malformed or empty output
    Unexpected,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::Auth => f.write_str("authentication"),
            GenerationFailure::Unexpected => f.write_str("unexpected"),
        }
    }
}

/// RAG pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid setting, including missing OCR tooling
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion source is missing or held nothing readable
    #[error("Document source not found: {0}")]
    SourceNotFound(String),

    /// A single document could not be read or parsed
    #[error("Failed to read document '{path}': {message}")]
    DocumentRead { path: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Nothing left to embed after blank chunks were dropped
    #[error("No valid chunks found to create embeddings")]
    NoChunksToEmbed,

    /// Embedding provider failure
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index write failure
    #[error("Vector index upsert failed: {0}")]
    IndexWrite(String),

    /// Vector index query failure
    #[error("Vector index query failed: {0}")]
    IndexQuery(String),

    /// LLM failure
    #[error("Answer generation failed ({kind}): {message}")]
    Generation {
        kind: GenerationFailure,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed request from an API caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document read error
    pub fn document_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an authentication failure from the LLM
    pub fn generation_auth(message: impl Into<String>) -> Self {
        Self::Generation {
            kind: GenerationFailure::Auth,
            message: message.into(),
        }
    }

    /// Create an unexpected LLM failure
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            kind: GenerationFailure::Unexpected,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Configuration problems are never skipped by lenient ingestion
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::SourceNotFound(msg) => (StatusCode::NOT_FOUND, "source_not_found", msg.clone()),
            Error::DocumentRead { path, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "document_read_error",
                format!("Failed to read '{}': {}", path, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::NoChunksToEmbed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "no_chunks",
                self.to_string(),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::IndexWrite(msg) => (StatusCode::BAD_GATEWAY, "index_write_error", msg.clone()),
            Error::IndexQuery(msg) => (StatusCode::BAD_GATEWAY, "index_query_error", msg.clone()),
            Error::Generation { kind, message } => {
                let error_type = match kind {
                    GenerationFailure::Auth => "llm_auth_error",
                    GenerationFailure::Unexpected => "llm_error",
                };
                (StatusCode::SERVICE_UNAVAILABLE, error_type, message.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (
                StatusCode::BAD_GATEWAY,
                "http_error",
                err.to_string(),
            ),
            Error::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
