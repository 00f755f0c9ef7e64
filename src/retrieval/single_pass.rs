use anyhow::Result;

use crate::models::RetrievedChunk;
use crate::search::VectorSearch;

/// Focused retrieval for queries that don't need the multi-pass battery.
///
/// Routes through the reranking variant when enabled, plain search otherwise.
/// Backend failures propagate to the caller — unlike multi-pass, a single
/// query has nothing to degrade onto at this layer. No dedup pass: one
/// search call cannot return duplicate chunks.
pub async fn search_knowledge_base(
    backend: &dyn VectorSearch,
    collection: &str,
    query: &str,
    n_results: usize,
    use_reranking: bool,
) -> Result<Vec<RetrievedChunk>> {
    if use_reranking {
        backend
            .search_with_reranking(collection, query, n_results)
            .await
    } else {
        backend.search(collection, query, n_results).await
    }
}
