//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dhwani_core::{Error, PipelineStage};
use serde_json::json;
use tracing::{error, warn};

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<PipelineStage>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stage: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    fn error_type(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "invalid_request_error",
            StatusCode::UNAUTHORIZED => "authentication_error",
            StatusCode::SERVICE_UNAVAILABLE => "model_unavailable_error",
            StatusCode::BAD_GATEWAY => "upstream_error",
            StatusCode::GATEWAY_TIMEOUT => "timeout_error",
            _ => "server_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "type": self.error_type(),
                "stage": self.stage.map(|stage| stage.as_str()),
                "code": self.status.as_str()
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidInput(_)
            | Error::UnsupportedLanguagePair { .. }
            | Error::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            Error::ModelLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Translation { .. } | Error::Generation { .. } | Error::Synthesis { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            match err.partial() {
                Some(partial) => error!("{} (last stage output: {:?})", err, partial),
                None => error!("{}", err),
            }
        } else {
            warn!("Rejected request: {}", err);
        }

        Self {
            status,
            message: err.to_string(),
            stage: err.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors_to_status_codes() {
        let cases = [
            (Error::InvalidInput("empty".into()), StatusCode::BAD_REQUEST),
            (
                Error::UnsupportedLanguagePair {
                    from: "kan_Knda".into(),
                    to: "hin_Deva".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::UnsupportedFormat("mp3".into()), StatusCode::BAD_REQUEST),
            (
                Error::ModelLoad {
                    key: "m".into(),
                    message: "oom".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::synthesis(Error::Backend("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (Error::Config("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn stage_errors_keep_their_stage() {
        let err = ApiError::from(Error::translation(
            PipelineStage::C,
            Error::Backend("down".into()),
            Some("reply".into()),
        ));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.stage, Some(PipelineStage::C));
        assert_eq!(err.error_type(), "upstream_error");
    }
}
