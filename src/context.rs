//! Context assembly: turn retrieved chunks into the text block and citation
//! instruction appended to the system prompt.

use std::collections::HashSet;

use crate::models::RetrievedChunk;

/// Render chunks into the knowledge-base context block.
///
/// Each chunk becomes `Document: <filename>\nContent: <content>`, joined by
/// blank lines. Input order is preserved — it decides what appears earliest
/// in the model's context window. Returns `None` for an empty slice.
pub fn build_context_block(chunks: &[RetrievedChunk]) -> Option<String> {
    if chunks.is_empty() {
        return None;
    }

    let block = chunks
        .iter()
        .map(|chunk| {
            format!(
                "Document: {}\nContent: {}",
                chunk.metadata.filename, chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(block)
}

/// Unique source filenames across the chunks, in first-appearance order.
pub fn distinct_source_files(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut files = Vec::new();

    for chunk in chunks {
        if seen.insert(chunk.metadata.filename.as_str()) {
            files.push(chunk.metadata.filename.clone());
        }
    }

    files
}

/// Append the knowledge-base context and the `Sources:` citation instruction
/// to a system prompt. Returns the augmented prompt and the distinct source
/// files. Empty retrieval leaves the prompt untouched and yields no sources.
pub fn augment_system_prompt(base: &str, chunks: &[RetrievedChunk]) -> (String, Vec<String>) {
    let Some(context) = build_context_block(chunks) else {
        return (base.to_string(), Vec::new());
    };

    let sources = distinct_source_files(chunks);
    let mut prompt =
        format!("{base}\n\nRelevant context from permanent knowledge base:\n\n{context}");
    if !sources.is_empty() {
        prompt.push_str(&format!(
            "\n\nIMPORTANT: At the end of your response, include a 'Sources:' \
             section listing the documents you referenced: {}",
            sources.join(", ")
        ));
    }

    (prompt, sources)
}
