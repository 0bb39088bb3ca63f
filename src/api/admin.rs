use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Readiness probe.
pub async fn home(State(state): State<AppState>) -> Json<Value> {
    let engine = state.engine();
    Json(json!({
        "message": "verse-search is ready",
        "verses": engine.store.len(),
        "lexical_index": engine.lexical.is_some(),
        "vectors": engine.vectors.entry_count(),
    }))
}

/// POST /api/reload - Rebuild the engine snapshot from the on-disk indexes
/// and swap it in atomically. Used after an out-of-band index rebuild.
pub async fn reload(State(state): State<AppState>) -> Result<StatusCode, (StatusCode, String)> {
    // Loading indexes reads files; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || state.reload()).await;

    match result {
        Ok(Ok(())) => {
            tracing::info!("Engine snapshot reloaded");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(Err(e)) => {
            tracing::error!("Reload failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reload failed".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!("Reload task panicked: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reload failed".to_string(),
            ))
        }
    }
}
