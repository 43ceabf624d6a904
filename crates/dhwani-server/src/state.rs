//! Shared application state with request backpressure

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dhwani_core::InferenceEngine;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::warn;

use crate::error::ApiError;

/// Listener and request-limit settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, `/v1/chat` requires a matching `X-API-Key` header.
    pub api_key: Option<String>,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7860,
            api_key: None,
            max_concurrent_requests: 100,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    /// Concurrency limiter to prevent resource exhaustion
    pub request_semaphore: Arc<Semaphore>,
    pub request_timeout: Duration,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(engine: InferenceEngine, config: &ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            request_semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(Arc::from),
        }
    }

    /// Acquire a permit for concurrent request processing
    pub async fn acquire_permit(&self) -> Result<SemaphorePermit<'_>, ApiError> {
        self.request_semaphore
            .acquire()
            .await
            .map_err(|_| ApiError::internal("Server is shutting down"))
    }

    /// Run `work` under a concurrency permit and the request timeout.
    pub async fn run_limited<F, T>(&self, work: F) -> Result<T, ApiError>
    where
        F: Future<Output = dhwani_core::Result<T>>,
    {
        let _permit = self.acquire_permit().await?;
        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => {
                warn!(
                    "Request exceeded {} second timeout",
                    self.request_timeout.as_secs()
                );
                Err(ApiError::timeout("Request timeout"))
            }
        }
    }
}
