//! HTTP client for a Chroma-style vector database service.
//!
//! The database owns embeddings, indexing, and similarity internals; this
//! client only speaks the query API and maps responses into
//! [`RetrievedChunk`]s.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{ChromaConfig, RerankerConfig};
use crate::models::{ChunkMetadata, RetrievedChunk};
use crate::search::{rerank, VectorSearch};

/// Over-fetch multiplier for the reranking variant: the cross-encoder sees
/// more candidates than the caller asked for, then the ranking decides.
const RERANK_FETCH_MULTIPLIER: usize = 3;

pub struct ChromaClient {
    http: reqwest::Client,
    config: ChromaConfig,
    reranker: RerankerConfig,
    /// Collection name -> id, resolved on first use.
    collection_ids: RwLock<HashMap<String, String>>,
}

impl ChromaClient {
    pub fn new(http: reqwest::Client, config: ChromaConfig, reranker: RerankerConfig) -> Self {
        Self {
            http,
            config,
            reranker,
            collection_ids: RwLock::new(HashMap::new()),
        }
    }

    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.collection_ids.read().get(name) {
            return Ok(id.clone());
        }

        let url = format!(
            "{}/api/v1/collections/{name}",
            self.config.base_url.trim_end_matches('/')
        );
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to reach vector database")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Collection lookup for '{name}' returned {status}: {body}");
        }

        let info: CollectionInfo = resp
            .json()
            .await
            .context("Failed to parse collection info")?;

        self.collection_ids
            .write()
            .insert(name.to_string(), info.id.clone());
        Ok(info.id)
    }
}

#[async_trait]
impl VectorSearch for ChromaClient {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let id = self.collection_id(collection).await?;
        let url = format!(
            "{}/api/v1/collections/{id}/query",
            self.config.base_url.trim_end_matches('/')
        );

        let req = QueryRequest {
            query_texts: vec![query.to_string()],
            n_results,
            include: vec!["documents", "metadatas", "distances"],
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to query vector database")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vector query returned {status}: {body}");
        }

        let body: QueryResponse = resp
            .json()
            .await
            .context("Failed to parse vector query response")?;

        Ok(map_query_response(body))
    }

    async fn search_with_reranking(
        &self,
        collection: &str,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let candidates = self
            .search(collection, query, n_results * RERANK_FETCH_MULTIPLIER)
            .await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let ranked =
            rerank::rerank(&self.http, &self.reranker, query, &documents, n_results).await?;

        let reordered = ranked
            .into_iter()
            .filter_map(|hit| {
                candidates.get(hit.index).map(|chunk| RetrievedChunk {
                    score: Some(hit.score),
                    ..chunk.clone()
                })
            })
            .take(n_results)
            .collect();

        Ok(reordered)
    }
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Serialize)]
struct QueryRequest {
    query_texts: Vec<String>,
    n_results: usize,
    include: Vec<&'static str>,
}

/// Chroma nests results per input query; we always send exactly one.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<String>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<serde_json::Map<String, serde_json::Value>>>>,
    #[serde(default)]
    distances: Vec<Vec<f32>>,
}

/// Flatten the first (only) result row into chunks, dropping entries that
/// break the data model: empty content, or no filename to cite.
fn map_query_response(resp: QueryResponse) -> Vec<RetrievedChunk> {
    let documents = resp.documents.into_iter().next().unwrap_or_default();
    let mut metadatas = resp.metadatas.into_iter().next().unwrap_or_default();
    let distances = resp.distances.into_iter().next().unwrap_or_default();

    let mut chunks = Vec::with_capacity(documents.len());

    for (i, content) in documents.into_iter().enumerate() {
        if content.is_empty() {
            tracing::debug!("Dropping empty chunk at rank {i}");
            continue;
        }

        let Some(mut metadata) = metadatas.get_mut(i).and_then(|m| m.take()) else {
            tracing::debug!("Dropping chunk at rank {i}: no metadata");
            continue;
        };

        let filename = match metadata.remove("filename") {
            Some(serde_json::Value::String(f)) if !f.is_empty() => f,
            _ => {
                tracing::debug!("Dropping chunk at rank {i}: no filename metadata");
                continue;
            }
        };

        // Chroma reports cosine distance; flip to a similarity-style score.
        let score = distances.get(i).map(|d| 1.0 - d);

        chunks.push(RetrievedChunk {
            content,
            metadata: ChunkMetadata {
                filename,
                extra: metadata,
            },
            score,
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(filename: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        let mut m = serde_json::Map::new();
        m.insert(
            "filename".to_string(),
            serde_json::Value::String(filename.to_string()),
        );
        Some(m)
    }

    #[test]
    fn test_map_response_basic() {
        let resp = QueryResponse {
            documents: vec![vec!["alpha".to_string(), "beta".to_string()]],
            metadatas: vec![vec![meta("a.pdf"), meta("b.pdf")]],
            distances: vec![vec![0.1, 0.4]],
        };

        let chunks = map_query_response(resp);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.filename, "a.pdf");
        assert!((chunks[0].score.unwrap() - 0.9).abs() < 1e-6);
        assert_eq!(chunks[1].content, "beta");
    }

    #[test]
    fn test_map_response_drops_missing_filename() {
        let resp = QueryResponse {
            documents: vec![vec!["kept".to_string(), "dropped".to_string()]],
            metadatas: vec![vec![meta("a.pdf"), Some(serde_json::Map::new())]],
            distances: vec![vec![0.1, 0.2]],
        };

        let chunks = map_query_response(resp);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "kept");
    }

    #[test]
    fn test_map_response_drops_empty_content() {
        let resp = QueryResponse {
            documents: vec![vec!["".to_string(), "kept".to_string()]],
            metadatas: vec![vec![meta("a.pdf"), meta("b.pdf")]],
            distances: vec![vec![0.1, 0.2]],
        };

        let chunks = map_query_response(resp);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.filename, "b.pdf");
    }

    #[test]
    fn test_map_response_missing_distances() {
        let resp = QueryResponse {
            documents: vec![vec!["alpha".to_string()]],
            metadatas: vec![vec![meta("a.pdf")]],
            distances: vec![],
        };

        let chunks = map_query_response(resp);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].score.is_none());
    }

    #[test]
    fn test_map_response_keeps_extra_metadata() {
        let mut m = meta("a.pdf").unwrap();
        m.insert("page".to_string(), serde_json::json!(7));
        let resp = QueryResponse {
            documents: vec![vec!["alpha".to_string()]],
            metadatas: vec![vec![Some(m)]],
            distances: vec![vec![0.0]],
        };

        let chunks = map_query_response(resp);
        assert_eq!(chunks[0].metadata.extra.get("page"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn test_map_response_empty() {
        let chunks = map_query_response(QueryResponse::default());
        assert!(chunks.is_empty());
    }
}
