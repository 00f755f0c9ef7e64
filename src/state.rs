use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{Config, LlmConfig};
use crate::search::chroma::ChromaClient;
use crate::search::VectorSearch;

/// Concurrent chat turns allowed before returning 503.
const CHAT_CONCURRENCY: usize = 3;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: Arc<dyn VectorSearch>,
    pub http_client: reqwest::Client,
    pub llm_config: Arc<RwLock<LlmConfig>>,
    pub system_prompt: Arc<str>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let system_prompt: Arc<str> = match &config.system_prompt_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read system prompt {}", path.display()))?
                .into(),
            None => default_system_prompt().into(),
        };

        let search = ChromaClient::new(
            http_client.clone(),
            config.chroma.clone(),
            config.reranker.clone(),
        );

        let llm_config = config.llm.clone();

        Ok(Self {
            config: Arc::new(config),
            search: Arc::new(search),
            http_client,
            llm_config: Arc::new(RwLock::new(llm_config)),
            system_prompt,
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(CHAT_CONCURRENCY)),
        })
    }
}

/// Fallback system prompt used when no prompt file is configured.
fn default_system_prompt() -> &'static str {
    "You are Betty, an AI assistant for strategic transformation through \
     Outcome-Based Thinking and What/How Mapping. You help organizations \
     activate, measure, and align strategic outcomes with business \
     structures.\n\
     Ground every answer in the knowledge-base context included with the \
     conversation. When the context does not answer the question, say what \
     is missing instead of guessing. Keep answers factual and concise."
}
