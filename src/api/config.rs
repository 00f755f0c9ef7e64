use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::models::LlmConfigUpdate;
use crate::state::AppState;

/// LLM config response with the API key redacted.
#[derive(Debug, Serialize)]
pub struct LlmConfigResponse {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub has_api_key: bool,
}

impl From<&LlmConfig> for LlmConfigResponse {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            has_api_key: config.api_key.is_some(),
        }
    }
}

/// GET /api/config — current LLM settings
pub async fn get_config(State(state): State<AppState>) -> Json<LlmConfigResponse> {
    let config = state.llm_config.read();
    Json(LlmConfigResponse::from(&*config))
}

/// PUT /api/config — update LLM settings at runtime
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<LlmConfigUpdate>,
) -> Json<LlmConfigResponse> {
    let mut config = state.llm_config.write();

    if let Some(provider) = update.provider {
        config.provider = provider;
    }
    // base_url is immutable at runtime (set via LLM_BASE_URL env var only)
    // to prevent SSRF: an attacker changing it could exfiltrate the API key
    if let Some(model) = update.model {
        config.model = model;
    }
    if let Some(api_key) = update.api_key {
        config.api_key = Some(api_key);
    }
    if let Some(max_tokens) = update.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(temperature) = update.temperature {
        config.temperature = temperature;
    }
    if let Some(top_p) = update.top_p {
        config.top_p = top_p;
    }

    Json(LlmConfigResponse::from(&*config))
}
