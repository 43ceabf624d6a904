//! Multilingual chat endpoint.

use axum::{extract::State, Json};
use dhwani_core::ChatRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LANGUAGE: &str = "kan_Knda";

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub source_lang: String,
    #[serde(default = "default_language")]
    pub target_lang: String,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(
        "Chat request: {} chars, {} -> {}",
        body.prompt.chars().count(),
        body.source_lang,
        body.target_lang
    );

    let request = ChatRequest {
        prompt: body.prompt,
        source_lang: body.source_lang,
        target_lang: body.target_lang,
    };
    let answer = state.run_limited(state.engine.answer(request)).await?;

    Ok(Json(ChatResponse {
        response: answer.text,
    }))
}
