use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{SearchRequest, SearchResponse};
use crate::search::engine::SearchError;
use crate::state::AppState;

/// POST /api/search - Full hybrid retrieval pipeline:
///   1. BM25 + vector search (chapter filter applied per branch)
///   2. RRF fusion → candidate pool
///   3. Cross-encoder re-ranking → top `limit`
///   4. Optional advisory text when `limit == 1`
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let _permit = state
        .search_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Search service at capacity".to_string(),
            )
        })?;

    // Snapshot the engine once; a concurrent reload cannot affect this query.
    let engine = state.engine();

    let results = engine
        .search(&req.query, req.limit, req.chapter)
        .await
        .map_err(|e| match e {
            SearchError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            SearchError::DependencyUnavailable(source) => {
                tracing::error!("Search dependency unavailable: {source:#}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Search is temporarily unavailable".to_string(),
                )
            }
            SearchError::Internal(source) => {
                tracing::error!("Search failed: {source:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Search failed".to_string(),
                )
            }
        })?;

    Ok(Json(SearchResponse { results }))
}
