use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{RetrievalMode, SearchRequest, SearchResponse};
use crate::retrieval::classifier::needs_multi_pass;
use crate::retrieval::multi_pass::multi_pass_retrieval;
use crate::retrieval::single_pass::search_knowledge_base;
use crate::state::AppState;

/// POST /api/search — direct retrieval endpoint.
///
/// Classifies the query (an explicit `multi_pass` flag overrides the
/// classifier) and returns the chunks the chat flow would ground on.
/// Multi-pass degrades on partial backend failure; a single-pass backend
/// failure surfaces as 500 — there is no response to fall back to here.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let multi = req
        .multi_pass
        .unwrap_or_else(|| needs_multi_pass(&query, &state.config.plan.triggers));

    if multi {
        let results = multi_pass_retrieval(
            state.search.as_ref(),
            &state.config.collection,
            &state.config.plan,
            &query,
        )
        .await;

        Ok(Json(SearchResponse {
            query,
            mode: RetrievalMode::MultiPass,
            results,
        }))
    } else {
        let limit = req.limit.unwrap_or(state.config.max_search_results).max(1);
        let results = search_knowledge_base(
            state.search.as_ref(),
            &state.config.collection,
            &query,
            limit,
            state.config.use_reranking,
        )
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search failed: {e}"),
            )
        })?;

        Ok(Json(SearchResponse {
            query,
            mode: RetrievalMode::SinglePass,
            results,
        }))
    }
}
