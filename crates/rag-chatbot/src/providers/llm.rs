//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `GroqClient`: Groq chat completions (llama-3.1-8b-instant)
/// - `GeminiClient`: Gemini streaming generation (gemini-2.5-flash)
///
/// Failures are reported as [`crate::Error::Generation`], with credential rejections
/// distinguished from everything else.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
