//! Prompt assembly and citation handling for grounded answers

pub mod citation;
pub mod prompt;

pub use citation::{web_source, with_citation};
pub use prompt::PromptBuilder;

/// Returned verbatim when no retrieved content answers the question
pub const FALLBACK_MESSAGE: &str =
    "I could not find any relevant information to answer that question in the provided documents.";

/// Returned when answering failed for any reason
pub const APOLOGY_MESSAGE: &str = "An error occurred while searching through the PDF documents. Please try again or rephrase your query.";
