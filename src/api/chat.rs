use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};

use crate::context::augment_system_prompt;
use crate::llm::chat_stream::stream_chat;
use crate::models::{ChatMessage, ChatRequest, RetrievalMode, RetrievedChunk};
use crate::retrieval::classifier::needs_multi_pass;
use crate::retrieval::multi_pass::multi_pass_retrieval;
use crate::retrieval::single_pass::search_knowledge_base;
use crate::state::AppState;

const MAX_CHAT_MESSAGE_LEN: usize = 2000;
const MAX_HISTORY_TURNS: usize = 10;
const IDLE_TIMEOUT_SECS: u64 = 30;

/// POST /api/chat — RAG chat endpoint with SSE streaming.
///
/// A retrieval failure never blocks the turn: worst case the model answers
/// without knowledge-base context.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    // ── Step 1: Validate and bound input ──────────────────
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }
    let message = truncate_to_char_boundary(&message, MAX_CHAT_MESSAGE_LEN);

    let history = validate_history(req.history);

    // ── Step 2: Acquire semaphore ─────────────────────────
    let _permit = state
        .chat_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Chat service at capacity".to_string(),
            )
        })?;

    // ── Step 3: Retrieve knowledge-base context ───────────
    let (mode, chunks) = retrieve_context(&state, &message).await;

    // ── Step 4: Build prompt ──────────────────────────────
    let (system_prompt, sources) = augment_system_prompt(&state.system_prompt, &chunks);
    let messages = build_messages(&history, &message);

    // ── Step 5: Build context SSE event ───────────────────
    let context_event = Event::default()
        .event("context")
        .json_data(serde_json::json!({ "mode": mode, "sources": sources }))
        .unwrap();

    // ── Step 6: Start LLM stream ──────────────────────────
    let llm_config = state.llm_config.read().clone();
    let llm_stream = stream_chat(&state.http_client, &llm_config, &system_prompt, messages)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("LLM error: {e}"),
            )
        })?;

    // ── Step 7: Map to SSE events with idle timeout ───────
    let idle_timeout = Duration::from_secs(IDLE_TIMEOUT_SECS);

    let delta_stream = futures_util::stream::unfold(
        (llm_stream, false),
        move |(mut llm_stream, errored)| async move {
            if errored {
                return None;
            }
            match tokio::time::timeout(idle_timeout, llm_stream.next()).await {
                Ok(Some(Ok(content))) => {
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("delta")
                        .json_data(serde_json::json!({ "content": content }))
                        .unwrap());
                    Some((event, (llm_stream, false)))
                }
                Ok(Some(Err(e))) => {
                    // Emit the error, then end the stream on the next poll
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("error")
                        .json_data(serde_json::json!({ "message": e.to_string() }))
                        .unwrap());
                    Some((event, (llm_stream, true)))
                }
                Ok(None) => None, // Stream ended naturally
                Err(_) => {
                    let event: Result<Event, Infallible> = Ok(Event::default()
                        .event("error")
                        .json_data(
                            serde_json::json!({ "message": "LLM response timed out (idle)" }),
                        )
                        .unwrap());
                    Some((event, (llm_stream, true)))
                }
            }
        },
    );

    let done_event: Result<Event, Infallible> = Ok(Event::default()
        .event("done")
        .json_data(serde_json::json!({}))
        .unwrap());

    let event_stream = stream::once(async move { Ok(context_event) })
        .chain(delta_stream)
        .chain(stream::once(async move { done_event }));

    // Hold the semaphore permit for the lifetime of the stream
    let event_stream = event_stream.map(move |event| {
        let _permit = &_permit;
        event
    });

    Ok(Sse::new(event_stream))
}

/// Classify the message and run the matching retrieval mode.
///
/// Multi-pass degrades internally; a single-pass backend failure is logged
/// here and the turn continues without context.
async fn retrieve_context(state: &AppState, message: &str) -> (RetrievalMode, Vec<RetrievedChunk>) {
    let plan = &state.config.plan;

    if needs_multi_pass(message, &plan.triggers) {
        let chunks =
            multi_pass_retrieval(state.search.as_ref(), &state.config.collection, plan, message)
                .await;
        (RetrievalMode::MultiPass, chunks)
    } else {
        let chunks = match search_knowledge_base(
            state.search.as_ref(),
            &state.config.collection,
            message,
            state.config.max_search_results,
            state.config.use_reranking,
        )
        .await
        {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("Knowledge-base search failed; answering without context: {e}");
                Vec::new()
            }
        };
        (RetrievalMode::SinglePass, chunks)
    }
}

// ─── Helper functions ────────────────────────────────────

fn validate_history(history: Option<Vec<ChatMessage>>) -> Vec<ChatMessage> {
    history
        .unwrap_or_default()
        .into_iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .map(|m| ChatMessage {
            role: m.role,
            content: truncate_to_char_boundary(&m.content, MAX_CHAT_MESSAGE_LEN),
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .take(MAX_HISTORY_TURNS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}

fn build_messages(history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend(history.iter().cloned());
    // The retrieved context lives in the system prompt; the user message
    // stays verbatim
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: message.to_string(),
    });
    messages
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
