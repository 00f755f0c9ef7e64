use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::retrieval::plan::RetrievalPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Knowledge collection queried on every chat turn
    pub collection: String,
    /// Single-pass result cap
    pub max_search_results: usize,
    /// Route single-pass searches through the cross-encoder reranker
    pub use_reranking: bool,
    /// System prompt file; a built-in prompt is used when unset
    pub system_prompt_path: Option<PathBuf>,
    /// Trigger phrases and sub-query battery for multi-pass retrieval
    pub plan: RetrievalPlan,
    /// Vector database client configuration
    pub chroma: ChromaConfig,
    /// Cross-encoder reranker sidecar configuration
    pub reranker: RerankerConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaConfig {
    /// Base URL of the vector database service
    pub base_url: String,
}

/// Configuration for the cross-encoder reranker sidecar (e.g. llama-server
/// with a reranker model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API. Required when reranking is enabled.
    pub base_url: Option<String>,
    /// Model name to send in the rerank request.
    pub model: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "claude" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key
    pub api_key: Option<String>,
    /// Maximum response length in tokens
    pub max_tokens: u32,
    /// Low temperature keeps answers factual and repeatable
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9100".to_string(),
            collection: "betty_knowledge".to_string(),
            max_search_results: 15,
            use_reranking: false,
            system_prompt_path: None,
            plan: RetrievalPlan::default(),
            chroma: ChromaConfig::default(),
            reranker: RerankerConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            timeout_secs: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "claude".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            max_tokens: 4000,
            temperature: 0.2,
            top_p: 0.9,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BETTY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(name) = std::env::var("BETTY_COLLECTION") {
            config.collection = name;
        }
        if let Ok(val) = std::env::var("BETTY_MAX_SEARCH_RESULTS") {
            if let Ok(v) = val.parse() {
                config.max_search_results = v;
            }
        }
        if let Ok(val) = std::env::var("BETTY_USE_RERANKING") {
            config.use_reranking = matches!(val.as_str(), "1" | "true" | "True");
        }
        if let Ok(path) = std::env::var("BETTY_SYSTEM_PROMPT") {
            config.system_prompt_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("BETTY_RETRIEVAL_PLAN") {
            // A broken plan file is a startup error, not a silent fallback
            // to defaults the operator didn't ask for.
            config.plan = RetrievalPlan::from_file(&path)?;
        }

        if let Ok(url) = std::env::var("CHROMA_BASE_URL") {
            config.chroma.base_url = url;
        }

        if let Ok(url) = std::env::var("RERANKER_BASE_URL") {
            config.reranker.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("RERANKER_MODEL") {
            config.reranker.model = Some(model);
        }
        if let Ok(val) = std::env::var("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30);
            }
        }

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.base_url = match provider.as_str() {
                "claude" => "https://api.anthropic.com".to_string(),
                "openai" => "https://api.openai.com".to_string(),
                other => anyhow::bail!("Unknown LLM provider: {other}"),
            };
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(v) = val.parse() {
                config.llm.max_tokens = v;
            }
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(v) = val.parse() {
                config.llm.temperature = v;
            }
        }
        if let Ok(val) = std::env::var("LLM_TOP_P") {
            if let Ok(v) = val.parse() {
                config.llm.top_p = v;
            }
        }

        config.plan.validate().context("Invalid retrieval plan")?;

        Ok(config)
    }
}
