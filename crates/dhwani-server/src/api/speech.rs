//! OpenAI-style speech synthesis endpoint.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
    Json,
};
use dhwani_core::{AudioEncoder, AudioFormat, SpeechRequest};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    /// Text to synthesize.
    pub input: String,
    /// Speaker description; the configured default voice when omitted.
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// `wav`, `flac`, `pcm` or `raw_f32`.
    #[serde(default)]
    pub response_format: Option<String>,
    /// Accepted for compatibility; playback speed cannot be changed.
    #[serde(default)]
    pub speed: Option<f32>,
}

pub async fn speech(
    State(state): State<AppState>,
    Json(body): Json<SpeechBody>,
) -> Result<Response<Body>, ApiError> {
    info!("Speech request: {} chars", body.input.chars().count());

    let format: AudioFormat = body.response_format.as_deref().unwrap_or("wav").parse()?;
    if !format.is_supported() {
        return Err(ApiError::bad_request(format!(
            "Unsupported audio format: {format}; use wav, flac, pcm or raw_f32"
        )));
    }
    if let Some(speed) = body.speed.filter(|speed| (*speed - 1.0).abs() > f32::EPSILON) {
        warn!("Ignoring unsupported speech speed {}", speed);
    }

    let request = SpeechRequest {
        text: body.input,
        voice_description: body.voice.unwrap_or_default(),
        model: body
            .model
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| state.engine.config().synthesis.default_model.clone()),
    };
    let speech = state.run_limited(state.engine.synthesize(request)).await?;

    let encoder = AudioEncoder::new(speech.sample_rate, 1);
    let duration_secs = speech.duration_secs();
    let rtf = speech.rtf();
    let generation_time_ms = speech.generation_time_ms;
    let chunk_count = speech.chunk_count;
    let samples = speech.samples;
    let audio_bytes = tokio::task::spawn_blocking(move || encoder.encode(&samples, format))
        .await
        .map_err(|e| ApiError::internal(format!("Audio encoding failed: {}", e)))??;

    Response::builder()
        .header(header::CONTENT_TYPE, AudioEncoder::content_type(format))
        .header("X-Generation-Time-Ms", format!("{:.1}", generation_time_ms))
        .header("X-Audio-Duration-Secs", format!("{:.2}", duration_secs))
        .header("X-RTF", format!("{:.3}", rtf))
        .header("X-Chunk-Count", chunk_count.to_string())
        .header(
            "Access-Control-Expose-Headers",
            "X-Generation-Time-Ms, X-Audio-Duration-Secs, X-RTF, X-Chunk-Count",
        )
        .body(Body::from(audio_bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::api::create_router;
    use crate::api::test_support::{bytes_body, json_body, post_json, sidecar_state, state};

    #[tokio::test]
    async fn compressed_formats_are_rejected_before_synthesis() {
        let app = create_router(state(None));

        let response = app
            .oneshot(post_json(
                "/v1/audio/speech",
                json!({ "input": "ನಮಸ್ಕಾರ", "response_format": "mp3" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn empty_input_is_a_bad_request() {
        let app = create_router(state(None));

        let response = app
            .oneshot(post_json("/v1/audio/speech", json!({ "input": "  " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn short_input_returns_wav_with_timing_headers() {
        let app = create_router(sidecar_state().await);

        let response = app
            .oneshot(post_json(
                "/v1/audio/speech",
                json!({ "input": "ನಮಸ್ಕಾರ ಜಗತ್ತು", "voice": "A calm voice." }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers["content-type"], "audio/wav");
        assert_eq!(headers["x-chunk-count"], "1");
        assert_eq!(headers["x-audio-duration-secs"], "0.10");
        assert!(headers.contains_key("x-rtf"));
        assert!(headers.contains_key("x-generation-time-ms"));
        assert!(headers["access-control-expose-headers"]
            .to_str()
            .unwrap()
            .contains("X-Chunk-Count"));

        let bytes = bytes_body(response).await;
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[tokio::test]
    async fn long_input_is_synthesized_in_chunks() {
        let app = create_router(sidecar_state().await);
        let input = vec!["ಪದ"; 20].join(" ");

        let response = app
            .oneshot(post_json(
                "/v1/audio/speech",
                json!({ "input": input, "response_format": "pcm" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-chunk-count"], "2");
        assert_eq!(response.headers()["x-audio-duration-secs"], "0.20");
        let bytes = bytes_body(response).await;
        assert_eq!(bytes.len(), 3200 * 2);
    }

    #[tokio::test]
    async fn unloadable_model_is_service_unavailable() {
        let app = create_router(sidecar_state().await);

        let response = app
            .oneshot(post_json(
                "/v1/audio/speech",
                json!({ "input": "ನಮಸ್ಕಾರ", "model": "missing" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "model_unavailable_error");
        assert!(body["error"]["stage"].is_null());
    }
}
