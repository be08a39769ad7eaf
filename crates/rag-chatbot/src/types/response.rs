//! Response types for answers and ingestion

use serde::{Deserialize, Serialize};

/// How a query was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The LLM answered from retrieved context
    Answered,
    /// Nothing relevant was retrieved
    NotFound,
    /// Something failed along the way; the answer is a generic apology
    Failed,
}

/// Outcome of one question, whatever happened while answering it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub query: String,
    pub answer: String,
    pub found: bool,
    /// Web source of the best match, present only when it was appended to the answer
    pub source_reference: Option<String>,
    pub status: AnswerStatus,
}

impl AnswerResult {
    pub fn answered(query: &str, answer: String, source_reference: Option<String>) -> Self {
        Self {
            query: query.to_string(),
            answer,
            found: true,
            source_reference,
            status: AnswerStatus::Answered,
        }
    }

    pub fn not_found(query: &str, answer: &str) -> Self {
        Self {
            query: query.to_string(),
            answer: answer.to_string(),
            found: false,
            source_reference: None,
            status: AnswerStatus::NotFound,
        }
    }

    pub fn failed(query: &str, answer: &str) -> Self {
        Self {
            query: query.to_string(),
            answer: answer.to_string(),
            found: false,
            source_reference: None,
            status: AnswerStatus::Failed,
        }
    }
}

/// Body returned by `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// 200 answered, 404 nothing relevant, 500 pipeline failure
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub query: String,
    pub answer: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
}

impl From<AnswerResult> for QueryResponse {
    fn from(result: AnswerResult) -> Self {
        let (status_code, message) = match result.status {
            AnswerStatus::Answered => (200, "Answer retrieved successfully"),
            AnswerStatus::NotFound => (404, "Information not found"),
            AnswerStatus::Failed => (500, "Error processing documents"),
        };

        Self {
            status_code,
            success: result.status == AnswerStatus::Answered,
            message: message.to_string(),
            query: result.query,
            answer: result.answer,
            found: result.found,
            source_reference: result.source_reference,
        }
    }
}

/// A file left out of a lenient ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Counts from one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Page records extracted across all files
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub vectors_stored: usize,
    pub files_skipped: Vec<SkippedFile>,
}

/// Body returned by `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

impl From<IngestSummary> for IngestResponse {
    fn from(summary: IngestSummary) -> Self {
        Self {
            status_code: 200,
            success: true,
            message: "Documents processed and stored successfully".to_string(),
            summary,
        }
    }
}
