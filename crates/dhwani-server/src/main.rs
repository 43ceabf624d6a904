//! Dhwani Server - HTTP API for multilingual chat, translation and speech synthesis

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;

use dhwani_core::{EngineConfig, InferenceEngine};
use state::{AppState, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "dhwani_server=info,dhwani_core=info,tower_http=info";

/// Dhwani inference server
#[derive(Debug, Parser)]
#[command(name = "dhwani-server", version, about)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "DHWANI_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "7860", env = "DHWANI_PORT")]
    port: u16,

    /// JSON engine configuration file
    #[arg(long, value_name = "PATH", env = "DHWANI_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the model sidecar
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// API key required by /v1/chat
    #[arg(long, env = "DHWANI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum concurrent requests
    #[arg(long, default_value = "100", env = "DHWANI_MAX_CONCURRENT")]
    max_concurrent: usize,

    /// Request timeout in seconds
    #[arg(long, default_value = "300", env = "DHWANI_TIMEOUT")]
    timeout: u64,

    /// Log filter, e.g. `info` or `dhwani_core=debug`; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            api_key: self.api_key.clone(),
            max_concurrent_requests: self.max_concurrent,
            request_timeout_secs: self.timeout,
        }
    }

    /// Defaults, then the config file, then `DHWANI_*` variables, then flags.
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        let mut config = config.with_env_overrides()?;
        if let Some(url) = &self.backend_url {
            config.backend.url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dhwani Server");

    let engine_config = args.engine_config()?;
    info!(
        "Chat model {}, speech model {}, pivot language {}",
        engine_config.chat.model,
        engine_config.synthesis.default_model,
        engine_config.translation.pivot_language
    );

    let server_config = args.server_config();
    if server_config.api_key.is_none() {
        warn!("No API key configured; /v1/chat is open");
    }

    let engine = InferenceEngine::new(engine_config)?;
    let state = AppState::new(engine, &server_config);
    info!("Inference engine initialized");

    let app = api::create_router(state.clone());

    let addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.engine.shutdown().await;
    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "dhwani-server",
            "--port",
            "9100",
            "--backend-url",
            "http://sidecar:9000",
            "--api-key",
            "k",
        ])
        .unwrap();

        assert_eq!(args.server_config().port, 9100);
        assert_eq!(args.server_config().api_key.as_deref(), Some("k"));
        assert_eq!(
            args.engine_config().unwrap().backend.url,
            "http://sidecar:9000"
        );
    }
}
