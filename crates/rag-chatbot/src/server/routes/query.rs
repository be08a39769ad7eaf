//! Question answering endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /query - answer a question from the indexed documents
///
/// Answering never fails at the HTTP level: misses and degraded answers are reported through
/// `status_code` and `found` in the body. Only a malformed request is rejected.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    let (top_k, min_score) = request.resolve(&state.config().retrieval)?;

    tracing::info!("Query: \"{}\" (top_k={}, min_score={:.2})", request.query, top_k, min_score);

    let result = state
        .orchestrator()
        .answer(request.query.trim(), top_k, min_score)
        .await;

    tracing::info!(
        "Answered in {}ms (status: {:?})",
        start.elapsed().as_millis(),
        result.status
    );

    Ok(Json(QueryResponse::from(result)))
}
