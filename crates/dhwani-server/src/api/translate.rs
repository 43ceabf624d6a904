//! Text translation endpoint.

use axum::{extract::State, Json};
use dhwani_core::TranslationRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translation: String,
}

pub async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<TranslateResponse>, ApiError> {
    info!(
        "Translation request: {} -> {}",
        body.source_lang, body.target_lang
    );

    let request = TranslationRequest {
        text: body.text,
        source_lang: body.source_lang,
        target_lang: body.target_lang,
    };
    let translation = state.run_limited(state.engine.translate(request)).await?;

    Ok(Json(TranslateResponse {
        translation: translation.text,
    }))
}
