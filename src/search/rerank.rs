//! Cross-encoder reranker via an OpenAI-compatible `/v1/rerank` endpoint.
//!
//! One batch request scores all query-chunk pairs; the sidecar model returns
//! raw relevance logits which are sigmoid-normalized here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;

/// Reranked position for one document.
#[derive(Debug, Clone)]
pub struct RerankHit {
    /// Index into the original documents slice.
    pub index: usize,
    /// Relevance score, 0.0-1.0 after sigmoid normalization.
    pub score: f32,
}

/// Rerank documents against a query using the configured cross-encoder
/// sidecar. Returns hits sorted by score descending. Errors if the sidecar
/// is not configured or unreachable.
pub async fn rerank(
    client: &reqwest::Client,
    config: &RerankerConfig,
    query: &str,
    documents: &[String],
    top_n: usize,
) -> Result<Vec<RerankHit>> {
    let base_url = config
        .base_url
        .as_deref()
        .context("Reranker base_url not configured")?;
    let model = config.model.as_deref().unwrap_or("default");

    let url = format!("{}/v1/rerank", base_url.trim_end_matches('/'));
    let req = RerankRequest {
        model: model.to_string(),
        query: query.to_string(),
        documents: documents.to_vec(),
        top_n,
    };

    let timeout = std::time::Duration::from_secs(config.timeout_secs.min(30));
    let resp = client
        .post(&url)
        .timeout(timeout)
        .json(&req)
        .send()
        .await
        .context("Failed to reach reranker endpoint")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Reranker returned {status}: {body}");
    }

    let body: RerankResponse = resp
        .json()
        .await
        .context("Failed to parse reranker response")?;

    let mut hits: Vec<RerankHit> = body
        .results
        .into_iter()
        .map(|r| RerankHit {
            index: r.index,
            score: sigmoid(r.relevance_score),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(hits)
}

/// Map raw logits into the 0-1 range.
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Serialize)]
struct RerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}
