use serde::{Deserialize, Serialize};

/// Provenance and auxiliary metadata stored alongside a chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document the chunk was extracted from. Drives citation.
    pub filename: String,
    /// Whatever else the vector database stored with the chunk.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A unit of text returned by the vector search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity score, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Which retrieval strategy served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    SinglePass,
    MultiPass,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Result cap for single-pass mode. Defaults to the configured value.
    pub limit: Option<usize>,
    /// Force a retrieval mode instead of running the classifier.
    pub multi_pass: Option<bool>,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: RetrievalMode,
    pub results: Vec<RetrievedChunk>,
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Option<Vec<ChatMessage>>,
}

/// A single chat turn (user or assistant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// LLM config update request
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfigUpdate {
    pub provider: Option<String>,
    // base_url intentionally omitted: immutable at runtime to prevent SSRF
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_mode_serializes_to_snake_case() {
        let json = serde_json::to_value(RetrievalMode::MultiPass).unwrap();
        assert_eq!(json, "multi_pass");
        let json = serde_json::to_value(RetrievalMode::SinglePass).unwrap();
        assert_eq!(json, "single_pass");
    }

    #[test]
    fn test_chunk_metadata_keeps_extra_fields() {
        let raw = r#"{"filename":"roadmap.pdf","page":4,"section":"scope"}"#;
        let meta: ChunkMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.filename, "roadmap.pdf");
        assert_eq!(meta.extra.get("page"), Some(&serde_json::json!(4)));
    }

    #[test]
    fn test_retrieved_chunk_score_optional() {
        let raw = r#"{"content":"text","metadata":{"filename":"a.docx"}}"#;
        let chunk: RetrievedChunk = serde_json::from_str(raw).unwrap();
        assert!(chunk.score.is_none());
    }
}
