//! Query request types

use serde::{Deserialize, Serialize};

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};

/// Question submitted to `/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,
    /// Nearest neighbours to request (server default when omitted)
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Minimum similarity a match needs to reach the LLM
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            min_score: None,
        }
    }

    /// Fill in omitted knobs from configuration and reject unusable values
    pub fn resolve(&self, defaults: &RetrievalConfig) -> Result<(usize, f32)> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        let top_k = self.top_k.unwrap_or(defaults.top_k);
        if top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }
        let min_score = self.min_score.unwrap_or(defaults.min_score);
        if !min_score.is_finite() {
            return Err(Error::InvalidRequest("min_score must be a number".to_string()));
        }
        Ok((top_k, min_score))
    }
}
