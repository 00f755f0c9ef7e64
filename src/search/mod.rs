//! Vector search boundary: the trait the retrieval orchestration calls, and
//! the HTTP clients behind it.

pub mod chroma;
pub mod rerank;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RetrievedChunk;

/// Nearest-neighbor search over a named knowledge collection.
///
/// The engine behind this trait is a black box: given a collection and a
/// query string it returns up to `n_results` scored chunks with provenance
/// metadata, best match first.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Search, then re-order by a secondary relevance model. Backends
    /// without a reranker keep the plain search ranking.
    async fn search_with_reranking(
        &self,
        collection: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        self.search(collection, query, n_results).await
    }
}
