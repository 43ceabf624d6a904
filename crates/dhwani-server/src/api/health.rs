//! Health check endpoint

use axum::{extract::State, Json};
use dhwani_core::ResidentModels;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chat_model: String,
    pub resident: ResidentModels,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        chat_model: state.engine.config().chat.model.clone(),
        resident: state.engine.resident_models().await,
    })
}
