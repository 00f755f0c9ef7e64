use std::collections::HashSet;

use crate::models::RetrievedChunk;
use crate::retrieval::plan::RetrievalPlan;
use crate::search::VectorSearch;

/// Hard cap on chunks returned by a multi-pass merge.
pub const MULTI_PASS_CHUNK_CAP: usize = 25;

/// Characters of chunk content used as the approximate dedup identity.
/// Two chunks sharing this prefix are treated as the same chunk even if
/// they diverge later.
pub const DEDUP_PREFIX_CHARS: usize = 100;

/// Run the fixed sub-query battery against a collection and merge the results.
///
/// Sub-queries run sequentially in plan order. A failing sub-query is logged
/// and skipped; the merge covers whatever succeeded, and all-fail yields an
/// empty result rather than an error. Merged chunks keep plan order (each
/// sub-query's own ranking preserved), deduplicate first-seen-wins on the
/// content prefix, and cap at [`MULTI_PASS_CHUNK_CAP`].
///
/// `original_query` is diagnostics only — the battery is static and never
/// sees the live user text.
pub async fn multi_pass_retrieval(
    backend: &dyn VectorSearch,
    collection: &str,
    plan: &RetrievalPlan,
    original_query: &str,
) -> Vec<RetrievedChunk> {
    let mut merged: Vec<RetrievedChunk> = Vec::new();

    for sub in &plan.battery {
        match backend.search(collection, &sub.query, sub.n_results).await {
            Ok(results) => merged.extend(results),
            Err(e) => {
                tracing::warn!(
                    "Multi-pass sub-query '{}' failed (query: '{original_query}'): {e}",
                    sub.query
                );
            }
        }
    }

    let unique = dedup_by_content_prefix(merged);
    tracing::info!(
        "Multi-pass retrieval for '{original_query}': {} unique chunks",
        unique.len().min(MULTI_PASS_CHUNK_CAP)
    );

    truncate_to_cap(unique)
}

/// Stable first-seen-wins dedup on the first [`DEDUP_PREFIX_CHARS`]
/// characters of content.
pub fn dedup_by_content_prefix(chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let key: String = chunk.content.chars().take(DEDUP_PREFIX_CHARS).collect();
        if seen.insert(key) {
            unique.push(chunk);
        }
    }

    unique
}

fn truncate_to_cap(mut chunks: Vec<RetrievedChunk>) -> Vec<RetrievedChunk> {
    chunks.truncate(MULTI_PASS_CHUNK_CAP);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn make_chunk(filename: &str, content: &str) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                extra: serde_json::Map::new(),
            },
            score: None,
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let shared_prefix = "x".repeat(DEDUP_PREFIX_CHARS);
        let chunks = vec![
            make_chunk("a.pdf", &format!("{shared_prefix} first tail")),
            make_chunk("b.pdf", &format!("{shared_prefix} second tail")),
        ];

        let unique = dedup_by_content_prefix(chunks);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].metadata.filename, "a.pdf");
        assert!(unique[0].content.ends_with("first tail"));
    }

    #[test]
    fn test_dedup_preserves_input_order() {
        let chunks = vec![
            make_chunk("a.pdf", "alpha"),
            make_chunk("b.pdf", "beta"),
            make_chunk("c.pdf", "gamma"),
        ];

        let unique = dedup_by_content_prefix(chunks);
        let contents: Vec<&str> = unique.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let shared_prefix = "y".repeat(DEDUP_PREFIX_CHARS);
        let chunks = vec![
            make_chunk("a.pdf", &format!("{shared_prefix} one")),
            make_chunk("b.pdf", "distinct"),
            make_chunk("c.pdf", &format!("{shared_prefix} two")),
        ];

        let once = dedup_by_content_prefix(chunks);
        let twice = dedup_by_content_prefix(once.clone());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.content, b.content);
            assert_eq!(a.metadata.filename, b.metadata.filename);
        }
    }

    #[test]
    fn test_short_chunks_compare_whole_content() {
        // Shorter than the prefix window: identity is the full content.
        let chunks = vec![
            make_chunk("a.pdf", "short"),
            make_chunk("b.pdf", "short"),
            make_chunk("c.pdf", "short but longer"),
        ];

        let unique = dedup_by_content_prefix(chunks);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_dedup_key_counts_characters_not_bytes() {
        // 100 multibyte chars exceed 100 bytes; the key must still cover
        // exactly 100 characters.
        let prefix: String = "é".repeat(DEDUP_PREFIX_CHARS);
        let chunks = vec![
            make_chunk("a.pdf", &format!("{prefix}suffix-one")),
            make_chunk("b.pdf", &format!("{prefix}suffix-two")),
        ];

        let unique = dedup_by_content_prefix(chunks);
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_divergence_within_prefix_is_not_a_duplicate() {
        let chunks = vec![
            make_chunk("a.pdf", &format!("{} tail", "a".repeat(99))),
            make_chunk("b.pdf", &format!("{} tail", "b".repeat(99))),
        ];

        let unique = dedup_by_content_prefix(chunks);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_truncate_to_cap() {
        let chunks: Vec<RetrievedChunk> = (0..40)
            .map(|i| make_chunk("a.pdf", &format!("chunk number {i}")))
            .collect();

        let capped = truncate_to_cap(dedup_by_content_prefix(chunks));
        assert_eq!(capped.len(), MULTI_PASS_CHUNK_CAP);
        assert_eq!(capped[0].content, "chunk number 0");
    }
}
