//! API routes and handlers

mod auth;
mod chat;
mod health;
mod speech;
mod translate;

use axum::{
    middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/v1/chat", post(chat::chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::temporary("/health") }))
        .route("/health", get(health::health_check))
        .route("/v1/audio/speech", post(speech::speech))
        .route("/v1/translate", post(translate::translate))
        .merge(chat_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
