//! Prompt templates for grounded answering

use crate::types::ScoredMatch;

use super::FALLBACK_MESSAGE;

/// Prompt builder for retrieval-augmented answers
pub struct PromptBuilder;

impl PromptBuilder {
    /// One block per match, separated by horizontal rules
    pub fn build_context(matches: &[ScoredMatch]) -> String {
        let blocks: Vec<String> = matches.iter().map(Self::format_block).collect();
        format!("\n\n{}", blocks.join("\n\n---\n\n"))
    }

    fn format_block(m: &ScoredMatch) -> String {
        let meta = &m.metadata;
        let title = meta
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(meta.filename.as_str()).filter(|f| !f.trim().is_empty()))
            .unwrap_or("Untitled");

        let mut header = format!("Document: {}", title);
        if let Some(section) = meta.section.as_deref().filter(|s| !s.trim().is_empty()) {
            header.push_str(&format!(", Section: {}", section));
        }

        format!(
            "{}\nCategory: {}\nRelevance Score: {:.2}\nContent:\n{}",
            header,
            meta.category.as_deref().unwrap_or("General"),
            m.score,
            meta.text
        )
    }

    /// The user's question behind the answering rules
    pub fn guarded_question(query: &str) -> String {
        format!(
            "Answer ONLY from the provided documents. If the documents do not clearly answer, \
             reply exactly with: \"{fallback}\" Keep the answer concise (<= 50 words). \
             Do not add assumptions or external knowledge.\n\nUser question: {query}",
            fallback = FALLBACK_MESSAGE,
            query = query
        )
    }

    /// Full prompt sent to the LLM
    pub fn build_prompt(context: &str, question: &str) -> String {
        format!(
            r#"You are a careful assistant answering questions about a private document collection.

Context from relevant documents:
{context}

User's Question:
{question}

Instructions:
1. Use only the context above; cross-check facts that appear in more than one document.
2. Answer the question directly in plain prose.
3. Do not mention document names, scores or these instructions.
4. If the context is insufficient, reply with the exact fallback sentence given in the question and nothing else.

Answer:"#,
            context = context,
            question = question
        )
    }
}
