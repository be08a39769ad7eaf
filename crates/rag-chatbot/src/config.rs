//! Configuration for the RAG pipeline
//!
//! Loaded once at startup: defaults, then an optional TOML file, then environment overrides.
//! Every constructor downstream takes the section it needs by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Answer generation configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// OCR tooling configuration
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Retrieval defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Retry policy for outbound provider calls
    #[serde(default)]
    pub retry: RetryConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Resolve the full configuration: file (if any), then process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the supplied lookup
    ///
    /// The lookup is injected so tests never touch the real process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PINECONE_API_KEY") {
            self.index.api_key = v;
        }
        if let Some(v) = get("PINECONE_INDEX_NAME") {
            self.index.index_name = v;
        }
        if let Some(v) = get("PINECONE_NAMESPACE") {
            self.index.namespace = v;
        }
        if let Some(v) = get("PINECONE_BATCH_SIZE") {
            self.index.batch_size = v.trim().parse().map_err(|_| {
                Error::Config(format!("PINECONE_BATCH_SIZE must be a positive integer, got '{}'", v))
            })?;
        }
        if let Some(v) = get("PINECONE_HOST") {
            self.index.host = Some(v);
        }
        if let Some(v) = get("INDEX_BACKEND") {
            self.index.backend = match v.to_lowercase().as_str() {
                "pinecone" => IndexBackend::Pinecone,
                "memory" => IndexBackend::Memory,
                other => return Err(Error::Config(format!("Unknown INDEX_BACKEND '{}'", other))),
            };
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.llm.groq.api_key = v;
        }
        if let Some(v) = get("GEMINI_API_KEY") {
            self.llm.gemini.api_key = v;
        }
        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = match v.to_lowercase().as_str() {
                "groq" => LlmBackend::Groq,
                "gemini" => LlmBackend::Gemini,
                other => return Err(Error::Config(format!("Unknown LLM_PROVIDER '{}'", other))),
            };
        }
        if let Some(v) = get("EMBEDDING_PROVIDER") {
            self.embeddings.backend = match v.to_lowercase().as_str() {
                "onnx" => EmbeddingBackend::Onnx,
                "ollama" => EmbeddingBackend::Ollama,
                other => {
                    return Err(Error::Config(format!("Unknown EMBEDDING_PROVIDER '{}'", other)))
                }
            };
        }
        if let Some(v) = get("POPPLER_PATH") {
            self.ocr.poppler_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("TESSERACT_PATH") {
            self.ocr.tesseract_cmd = v;
        }
        if let Some(v) = get("RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("RAG_PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("RAG_PORT must be a port number, got '{}'", v)))?;
        }

        Ok(())
    }

    /// Check required settings, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.index.backend == IndexBackend::Pinecone {
            if self.index.index_name.trim().is_empty() {
                return Err(Error::Config("PINECONE_INDEX_NAME is not configured".to_string()));
            }
            if self.index.api_key.trim().is_empty() {
                return Err(Error::Config("PINECONE_API_KEY is not configured".to_string()));
            }
        }
        if self.index.batch_size == 0 {
            return Err(Error::Config("index.batch_size must be greater than zero".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be greater than zero".to_string()));
        }
        if self.embeddings.dimensions != self.index.dimension {
            return Err(Error::Config(format!(
                "Embedding dimensions ({}) do not match index dimension ({})",
                self.embeddings.dimensions, self.index.dimension
            )));
        }
        self.chunking.validate()?;

        match self.llm.provider {
            LlmBackend::Groq if self.llm.groq.api_key.trim().is_empty() => {
                Err(Error::Config("GROQ_API_KEY is not configured".to_string()))
            }
            LlmBackend::Gemini if self.llm.gemini.api_key.trim().is_empty() => {
                Err(Error::Config("GEMINI_API_KEY is not configured".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which vector index implementation to talk to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Pinecone serverless index
    #[default]
    Pinecone,
    /// In-process index, lost on restart
    Memory,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub backend: IndexBackend,
    /// Pinecone API key
    #[serde(default)]
    pub api_key: String,
    /// Index name (created on startup when missing)
    #[serde(default)]
    pub index_name: String,
    /// Namespace all reads and writes are scoped to
    #[serde(default)]
    pub namespace: String,
    /// Vectors per upsert request
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
    /// Vector dimensionality the index is created with
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Similarity metric the index is created with
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Serverless cloud
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Serverless region
    #[serde(default = "default_region")]
    pub region: String,
    /// Control plane base URL
    #[serde(default = "default_control_url")]
    pub control_url: String,
    /// Data plane host; resolved from the control plane when unset
    #[serde(default)]
    pub host: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

fn default_index_batch_size() -> usize { 100 }
fn default_dimension() -> usize { 768 }
fn default_metric() -> String { "cosine".to_string() }
fn default_cloud() -> String { "aws".to_string() }
fn default_region() -> String { "us-east-1".to_string() }
fn default_control_url() -> String { "https://api.pinecone.io".to_string() }
fn default_index_timeout() -> u64 { 30 }

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            api_key: String::new(),
            index_name: String::new(),
            namespace: String::new(),
            batch_size: 100,
            dimension: 768,
            metric: default_metric(),
            cloud: default_cloud(),
            region: default_region(),
            control_url: default_control_url(),
            host: None,
            timeout_secs: 30,
        }
    }
}

/// Which embedding model implementation to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local sentence-transformer through ONNX Runtime
    #[default]
    Onnx,
    /// Remote Ollama server
    Ollama,
}

/// How chunk identifiers are generated
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random UUID v4 per chunk; re-ingesting duplicates vectors
    #[default]
    Random,
    /// SHA-256 of source, page and text; re-ingesting overwrites
    ContentHash,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    /// HuggingFace model repository (default: intfloat/e5-base-v2)
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (768 for e5-base-v2 and nomic-embed-text)
    #[serde(default = "default_dimension")]
    pub dimensions: usize,
    /// Texts per encoder call
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
    /// Maximum sequence length in tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Cache directory for downloaded models
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Ollama base URL (ollama backend only)
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    /// Ollama embedding model (ollama backend only)
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    /// Prepended to questions before encoding
    #[serde(default)]
    pub query_prefix: String,
    /// Prepended to chunk text before encoding
    #[serde(default)]
    pub passage_prefix: String,
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

fn default_embedding_model() -> String { "intfloat/e5-base-v2".to_string() }
fn default_embedding_batch_size() -> usize { 32 }
fn default_max_length() -> usize { 512 }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "nomic-embed-text".to_string() }

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rag-chatbot")
        .join("models")
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: default_embedding_model(),
            dimensions: 768,
            batch_size: 32,
            max_length: 512,
            cache_dir: default_cache_dir(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            query_prefix: String::new(),
            passage_prefix: String::new(),
            id_strategy: IdStrategy::Random,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Overlap must leave room for new text in every chunk
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Which hosted LLM answers questions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Groq,
    Gemini,
}

/// Answer generation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmBackend,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Groq chat-completions settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_groq_url")]
    pub base_url: String,
    #[serde(default = "default_groq_model")]
    pub model: String,
    /// 0.0 makes answers deterministic
    #[serde(default = "default_groq_temperature")]
    pub temperature: f32,
    #[serde(default = "default_groq_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_groq_url() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_groq_model() -> String { "llama-3.1-8b-instant".to_string() }
fn default_groq_temperature() -> f32 { 0.2 }
fn default_groq_max_tokens() -> u32 { 1024 }
fn default_llm_timeout() -> u64 { 120 }

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_groq_url(),
            model: default_groq_model(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

/// Gemini streaming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_temperature")]
    pub temperature: f32,
    #[serde(default = "default_gemini_top_p")]
    pub top_p: f32,
    #[serde(default = "default_gemini_max_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_gemini_model() -> String { "gemini-2.5-flash".to_string() }
fn default_gemini_temperature() -> f32 { 0.5 }
fn default_gemini_top_p() -> f32 { 0.95 }
fn default_gemini_max_tokens() -> u32 { 4000 }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            temperature: 0.5,
            top_p: 0.95,
            max_output_tokens: 4000,
            timeout_secs: 120,
        }
    }
}

/// OCR tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Directory holding the poppler binaries; PATH lookup when unset
    #[serde(default)]
    pub poppler_path: Option<PathBuf>,
    /// Tesseract executable
    #[serde(default = "default_tesseract")]
    pub tesseract_cmd: String,
    /// Render resolution for scanned pages
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Tesseract language pack
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_tesseract() -> String { "tesseract".to_string() }
fn default_dpi() -> u32 { 150 }
fn default_language() -> String { "eng".to_string() }

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            poppler_path: None,
            tesseract_cmd: default_tesseract(),
            dpi: 150,
            language: default_language(),
        }
    }
}

/// Retrieval defaults used when a request omits them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.5,
        }
    }
}

/// Bounded exponential backoff for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embeddings.batch_size, 32);
        assert_eq!(config.index.batch_size, 100);
        assert_eq!(config.index.dimension, 768);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.groq.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.gemini.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config
            .apply_env_overrides(env(&[
                ("PINECONE_API_KEY", "pk"),
                ("PINECONE_INDEX_NAME", "docs"),
                ("PINECONE_NAMESPACE", "handbook"),
                ("PINECONE_BATCH_SIZE", "50"),
                ("LLM_PROVIDER", "gemini"),
                ("GEMINI_API_KEY", "gk"),
                ("POPPLER_PATH", "/opt/poppler/bin"),
            ]))
            .unwrap();

        assert_eq!(config.index.namespace, "handbook");
        assert_eq!(config.index.batch_size, 50);
        assert_eq!(config.llm.provider, LlmBackend::Gemini);
        assert_eq!(config.ocr.poppler_path, Some(PathBuf::from("/opt/poppler/bin")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_batch_size_is_config_error() {
        let mut config = RagConfig::default();
        let err = config
            .apply_env_overrides(env(&[("PINECONE_BATCH_SIZE", "lots")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_index_name() {
        let mut config = RagConfig::default();
        config.index.api_key = "pk".into();
        config.llm.groq.api_key = "gk".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PINECONE_INDEX_NAME"));

        config.index.backend = IndexBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [index]
            backend = "memory"
            namespace = "tests"

            [embeddings]
            id_strategy = "content_hash"
            "#,
        )
        .unwrap();

        assert_eq!(config.index.backend, IndexBackend::Memory);
        assert_eq!(config.index.batch_size, 100);
        assert_eq!(config.embeddings.id_strategy, IdStrategy::ContentHash);
        assert_eq!(config.embeddings.model, "intfloat/e5-base-v2");
    }
}
