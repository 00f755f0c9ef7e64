use anyhow::{Context, Result};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::ChatMessage;

type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Stream chat completions from the configured provider.
/// Returns a stream of content delta strings (one per token/chunk).
///
/// The system prompt travels out-of-band for Claude (top-level `system`
/// field) and as a leading `system` message for OpenAI-compatible APIs.
pub async fn stream_chat(
    client: &reqwest::Client,
    config: &LlmConfig,
    system_prompt: &str,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    match config.provider.as_str() {
        "claude" => stream_claude(client, config, system_prompt, messages).await,
        "openai" => stream_openai(client, config, system_prompt, messages).await,
        other => anyhow::bail!("Unsupported LLM provider for chat: {other}"),
    }
}

// ─── Claude streaming ────────────────────────────────────

#[derive(Serialize)]
struct ClaudeStreamRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    system: String,
    messages: Vec<StreamMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct StreamMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<ClaudeDelta>,
    #[serde(default)]
    error: Option<ClaudeApiError>,
}

#[derive(Deserialize)]
struct ClaudeDelta {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeApiError {
    message: String,
}

async fn stream_claude(
    client: &reqwest::Client,
    config: &LlmConfig,
    system_prompt: &str,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
    let api_key = config
        .api_key
        .as_deref()
        .context("Claude API key not configured")?;

    let req = ClaudeStreamRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        system: system_prompt.to_string(),
        messages: messages
            .into_iter()
            .map(|m| StreamMessage {
                role: m.role,
                content: m.content,
            })
            .collect(),
        stream: true,
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&req)
        .send()
        .await
        .context("Failed to connect to Claude for chat streaming")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Claude API returned {status}: {body}");
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_claude_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

/// Parse a single Claude SSE line. Returns:
/// - Some(Ok(text)) for text deltas
/// - Some(Err(e)) for API errors and parse errors
/// - None to skip (event labels, pings, message bookkeeping)
fn parse_claude_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data: ")?.trim();

    match serde_json::from_str::<ClaudeStreamEvent>(data) {
        Ok(event) => match event.kind.as_str() {
            "content_block_delta" => {
                let text = event.delta.and_then(|d| {
                    if d.kind == "text_delta" {
                        d.text
                    } else {
                        None
                    }
                })?;
                if text.is_empty() {
                    return None;
                }
                Some(Ok(text))
            }
            "error" => {
                let message = event
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "unknown error".to_string());
                Some(Err(anyhow::anyhow!("Claude stream error: {message}")))
            }
            _ => None,
        },
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse Claude event: {e}"))),
    }
}

// ─── OpenAI streaming ────────────────────────────────────

#[derive(Serialize)]
struct OpenAiStreamRequest {
    model: String,
    messages: Vec<StreamMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}

async fn stream_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    system_prompt: &str,
    messages: Vec<ChatMessage>,
) -> Result<ChatStream> {
    let url = format!(
        "{}/v1/chat/completions",
        config.base_url.trim_end_matches('/')
    );

    let mut wire_messages = Vec::with_capacity(messages.len() + 1);
    wire_messages.push(StreamMessage {
        role: "system".to_string(),
        content: system_prompt.to_string(),
    });
    wire_messages.extend(messages.into_iter().map(|m| StreamMessage {
        role: m.role,
        content: m.content,
    }));

    let req = OpenAiStreamRequest {
        model: config.model.clone(),
        messages: wire_messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        stream: true,
    };

    let resp = client
        .post(&url)
        .timeout(Duration::from_secs(300))
        .header(
            "Authorization",
            format!("Bearer {}", config.api_key.as_deref().unwrap_or("")),
        )
        .json(&req)
        .send()
        .await
        .context("Failed to connect to OpenAI for chat streaming")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_openai_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

/// Parse a single OpenAI SSE line. Returns:
/// - Some(Ok(content)) for content deltas
/// - Some(Err(e)) for parse errors
/// - None to skip (empty lines, [DONE], role-only chunks)
fn parse_openai_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(chunk) => {
            let content = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default();
            if content.is_empty() {
                return None;
            }
            Some(Ok(content))
        }
        Err(e) => Some(Err(anyhow::anyhow!("Failed to parse OpenAI chunk: {e}"))),
    }
}

// ─── Line buffering ──────────────────────────────────────

/// Convert a byte stream into a stream of complete lines.
fn stream_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), String::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                // Drain complete lines from the buffer first
                if let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].to_string();
                    buffer = buffer[newline_pos + 1..].to_string();
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        // Stream ended — emit remaining buffer if non-empty
                        if !buffer.trim().is_empty() {
                            let remaining = std::mem::take(&mut buffer);
                            return Some((Ok(remaining), (stream, buffer)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Claude parsing ──────────────────────────────────

    #[test]
    fn test_parse_claude_text_delta() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Outcome"}}"#;
        let result = parse_claude_line(line);
        assert_eq!(result.unwrap().unwrap(), "Outcome");
    }

    #[test]
    fn test_parse_claude_message_stop() {
        let line = r#"data: {"type":"message_stop"}"#;
        assert!(parse_claude_line(line).is_none());
    }

    #[test]
    fn test_parse_claude_ping() {
        let line = r#"data: {"type":"ping"}"#;
        assert!(parse_claude_line(line).is_none());
    }

    #[test]
    fn test_parse_claude_event_label_line() {
        // SSE event-name lines carry no payload
        assert!(parse_claude_line("event: content_block_delta").is_none());
    }

    #[test]
    fn test_parse_claude_non_text_delta() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{}"}}"#;
        assert!(parse_claude_line(line).is_none());
    }

    #[test]
    fn test_parse_claude_error_event() {
        let line = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let result = parse_claude_line(line);
        assert!(result.unwrap().is_err());
    }

    #[test]
    fn test_parse_claude_malformed() {
        let line = "data: not valid json{{{";
        let result = parse_claude_line(line);
        assert!(result.unwrap().is_err());
    }

    // ─── OpenAI parsing ──────────────────────────────────

    #[test]
    fn test_parse_openai_data_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        let result = parse_openai_line(line);
        assert_eq!(result.unwrap().unwrap(), "Hello");
    }

    #[test]
    fn test_parse_openai_done() {
        assert!(parse_openai_line("data: [DONE]").is_none());
    }

    #[test]
    fn test_parse_openai_empty_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":null}}]}"#;
        assert!(parse_openai_line(line).is_none());
    }

    #[test]
    fn test_parse_openai_role_only_chunk() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(parse_openai_line(line).is_none());
    }

    #[test]
    fn test_parse_openai_malformed() {
        let line = "data: {broken json";
        let result = parse_openai_line(line);
        assert!(result.unwrap().is_err());
    }

    // ─── Edge cases ──────────────────────────────────────

    #[test]
    fn test_parse_empty_line() {
        assert!(parse_claude_line("").is_none());
        assert!(parse_openai_line("").is_none());
    }

    #[test]
    fn test_parse_whitespace_line() {
        assert!(parse_claude_line("   ").is_none());
        assert!(parse_openai_line("   ").is_none());
    }
}
