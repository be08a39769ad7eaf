//! Question answering over retrieved chunks
//!
//! Relevance is enforced twice: matches below `min_score` never reach the prompt, and the
//! prompt itself tells the model to answer only from the supplied context. Any failure along
//! the way degrades to an apology rather than an error.

use std::sync::Arc;

use crate::embeddings::EmbeddingGenerator;
use crate::error::{Error, GenerationFailure, Result};
use crate::generation::{web_source, with_citation, PromptBuilder, APOLOGY_MESSAGE, FALLBACK_MESSAGE};
use crate::providers::LlmProvider;
use crate::types::{AnswerResult, ScoredMatch};

use super::vector_store::VectorStoreClient;

/// Embeds a question, retrieves context, and asks the LLM for a grounded answer
pub struct AnswerOrchestrator {
    embeddings: Arc<EmbeddingGenerator>,
    store: Arc<VectorStoreClient>,
    llm: Arc<dyn LlmProvider>,
}

impl AnswerOrchestrator {
    pub fn new(
        embeddings: Arc<EmbeddingGenerator>,
        store: Arc<VectorStoreClient>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            embeddings,
            store,
            llm,
        }
    }

    /// Answer a question. Never fails; see [`AnswerResult::status`].
    pub async fn answer(&self, query: &str, top_k: usize, min_score: f32) -> AnswerResult {
        match self.try_answer(query, top_k, min_score).await {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    Error::Generation {
                        kind: GenerationFailure::Auth,
                        ..
                    } => tracing::error!("LLM authentication failed for query {:?}: {}", query, e),
                    _ => tracing::error!("Failed to answer query {:?}: {}", query, e),
                }
                AnswerResult::failed(query, APOLOGY_MESSAGE)
            }
        }
    }

    async fn try_answer(&self, query: &str, top_k: usize, min_score: f32) -> Result<AnswerResult> {
        let vector = self.embeddings.embed_query(query).await?;
        let matches = self.store.query(&vector, top_k, min_score).await?;

        let (relevant, top_source) = select_relevant(matches, min_score);
        if relevant.is_empty() {
            tracing::info!("No relevant matches for query {:?}", query);
            return Ok(AnswerResult::not_found(query, FALLBACK_MESSAGE));
        }

        tracing::debug!("Answering from {} relevant chunks", relevant.len());

        let context = PromptBuilder::build_context(&relevant);
        let question = PromptBuilder::guarded_question(query);
        let prompt = PromptBuilder::build_prompt(&context, &question);

        let answer = self.llm.generate(&prompt).await?;
        let answer = answer.trim();

        // The model declining is still a successful answer, just never cited.
        if answer == FALLBACK_MESSAGE {
            return Ok(AnswerResult::answered(query, answer.to_string(), None));
        }

        match top_source.as_deref().and_then(web_source) {
            Some(url) => Ok(AnswerResult::answered(
                query,
                with_citation(answer, &url),
                Some(url),
            )),
            None => Ok(AnswerResult::answered(query, answer.to_string(), None)),
        }
    }
}

/// Matches worth showing the model, plus the source of the best one
fn select_relevant(matches: Vec<ScoredMatch>, min_score: f32) -> (Vec<ScoredMatch>, Option<String>) {
    let mut best: Option<(f32, String)> = None;
    let mut relevant = Vec::with_capacity(matches.len());

    for m in matches {
        if m.score < min_score || m.metadata.text.trim().is_empty() {
            continue;
        }
        if best.as_ref().map_or(true, |(score, _)| m.score > *score) {
            best = Some((m.score, m.metadata.source_path.clone()));
        }
        relevant.push(m);
    }

    (relevant, best.map(|(_, source)| source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::testing::{scored, KeywordEmbedder, RecordingIndex, Script, ScriptedLlm};
    use crate::types::AnswerStatus;

    fn orchestrator(index: RecordingIndex, llm: Arc<ScriptedLlm>) -> AnswerOrchestrator {
        let embeddings = EmbeddingGenerator::new(
            Arc::new(KeywordEmbedder::new(8)),
            &EmbeddingConfig {
                dimensions: 8,
                ..EmbeddingConfig::default()
            },
        );
        AnswerOrchestrator::new(
            Arc::new(embeddings),
            Arc::new(VectorStoreClient::new(Arc::new(index), "docs", 100)),
            llm,
        )
    }

    #[tokio::test]
    async fn test_nothing_above_threshold_returns_fallback() {
        let llm = Arc::new(ScriptedLlm::replying("should not be called"));
        let index = RecordingIndex::with_matches(vec![scored("a", 0.4, "Refunds", "https://x.io/a.pdf")]);

        let result = orchestrator(index, llm.clone())
            .answer("How long do refunds take?", 5, 0.9)
            .await;

        assert!(!result.found);
        assert_eq!(result.answer, FALLBACK_MESSAGE);
        assert_eq!(result.status, AnswerStatus::NotFound);
        assert!(result.source_reference.is_none());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_matches_are_ignored() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let index = RecordingIndex::with_matches(vec![scored("a", 0.95, "   ", "https://x.io/a.pdf")]);

        let result = orchestrator(index, llm.clone()).answer("anything", 5, 0.5).await;
        assert_eq!(result.status, AnswerStatus::NotFound);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_cites_best_web_source() {
        let llm = Arc::new(ScriptedLlm::replying("  Refunds take five business days.  "));
        let index = RecordingIndex::with_matches(vec![
            scored("a", 0.71, "Contact support first.", "https://x.io/support.pdf"),
            scored("b", 0.93, "Refunds take five business days.", "https://x.io/refunds.pdf"),
        ]);

        let result = orchestrator(index, llm).answer("How long do refunds take?", 5, 0.5).await;

        assert!(result.found);
        assert_eq!(result.status, AnswerStatus::Answered);
        assert_eq!(
            result.answer,
            "Refunds take five business days.\nSource: https://x.io/refunds.pdf"
        );
        assert_eq!(result.source_reference.as_deref(), Some("https://x.io/refunds.pdf"));
    }

    #[tokio::test]
    async fn test_local_source_is_not_cited() {
        let llm = Arc::new(ScriptedLlm::replying("Five days."));
        let index = RecordingIndex::with_matches(vec![scored("a", 0.9, "Refunds take five days.", "/tmp/x.pdf")]);

        let result = orchestrator(index, llm).answer("refunds?", 5, 0.5).await;

        assert!(result.found);
        assert_eq!(result.answer, "Five days.");
        assert!(!result.answer.contains("Source:"));
        assert!(result.source_reference.is_none());
    }

    #[tokio::test]
    async fn test_model_fallback_is_not_cited() {
        let llm = Arc::new(ScriptedLlm::replying(&format!("{}\n", FALLBACK_MESSAGE)));
        let index = RecordingIndex::with_matches(vec![scored("a", 0.9, "Unrelated text.", "https://x.io/a.pdf")]);

        let result = orchestrator(index, llm).answer("What is the CEO's name?", 5, 0.5).await;

        assert!(result.found);
        assert_eq!(result.status, AnswerStatus::Answered);
        assert_eq!(result.answer, FALLBACK_MESSAGE);
        assert!(!result.answer.contains("Source:"));
        assert!(result.source_reference.is_none());
    }

    #[tokio::test]
    async fn test_low_scores_never_reach_prompt() {
        let llm = Arc::new(ScriptedLlm::replying("ok"));
        let index = RecordingIndex::with_matches(vec![
            scored("a", 0.88, "KEEP-THIS-TEXT", "/a.pdf"),
            scored("b", 0.31, "DROP-THIS-TEXT", "/b.pdf"),
        ]);

        orchestrator(index, llm.clone()).answer("question", 5, 0.5).await;

        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("KEEP-THIS-TEXT"));
        assert!(!prompts[0].contains("DROP-THIS-TEXT"));
        assert!(prompts[0].contains("Relevance Score: 0.88"));
        assert!(prompts[0].contains("User question: question"));
    }

    #[tokio::test]
    async fn test_failures_degrade_to_apology() {
        for script in [Script::AuthFailure, Script::Failure] {
            let llm = Arc::new(ScriptedLlm::new(script));
            let index = RecordingIndex::with_matches(vec![scored("a", 0.9, "text", "https://x.io/a.pdf")]);

            let result = orchestrator(index, llm).answer("q", 5, 0.5).await;
            assert!(!result.found);
            assert_eq!(result.answer, APOLOGY_MESSAGE);
            assert_eq!(result.status, AnswerStatus::Failed);
            assert!(result.source_reference.is_none());
        }

        let index = RecordingIndex {
            fail_queries: true,
            ..Default::default()
        };
        let result = orchestrator(index, Arc::new(ScriptedLlm::replying("x"))).answer("q", 5, 0.5).await;
        assert_eq!(result.status, AnswerStatus::Failed);
    }

    #[test]
    fn test_select_relevant_keeps_first_of_tied_best() {
        let (relevant, source) = select_relevant(
            vec![
                scored("a", 0.8, "one", "https://x.io/first.pdf"),
                scored("b", 0.8, "two", "https://x.io/second.pdf"),
                scored("c", 0.2, "three", "https://x.io/third.pdf"),
            ],
            0.5,
        );
        assert_eq!(relevant.len(), 2);
        assert_eq!(source.as_deref(), Some("https://x.io/first.pdf"));
    }
}
