//! Runtime service orchestrator.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::backends::{
    ChatHandle, ModelLoader, SidecarBackend, SpeechHandle, TranslationHandle,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::ModelCache;

/// Main inference engine runtime.
pub struct InferenceEngine {
    pub(crate) config: EngineConfig,
    pub(crate) speech_models: ModelCache<SpeechHandle>,
    pub(crate) chat_models: ModelCache<ChatHandle>,
    pub(crate) translators: ModelCache<TranslationHandle>,
}

/// Keys of the models currently resident in each cache, least recently used first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResidentModels {
    pub speech: Vec<String>,
    pub chat: Vec<String>,
    pub translation: Vec<String>,
}

impl InferenceEngine {
    /// Create an engine whose models are served by the configured sidecar.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(SidecarBackend::new(&config.backend)?);
        info!("Using model sidecar at {}", config.backend.url);

        Self::with_loaders(config, backend.clone(), backend.clone(), backend)
    }

    /// Create an engine from explicit loaders, one per model family.
    pub fn with_loaders(
        config: EngineConfig,
        speech_loader: Arc<dyn ModelLoader<SpeechHandle>>,
        chat_loader: Arc<dyn ModelLoader<ChatHandle>>,
        translation_loader: Arc<dyn ModelLoader<TranslationHandle>>,
    ) -> Result<Self> {
        config.validate()?;

        let speech_models =
            ModelCache::new("speech", config.cache.speech_capacity, speech_loader)?;
        let chat_models = ModelCache::new("chat", config.cache.chat_capacity, chat_loader)?;
        let translators = ModelCache::new(
            "translation",
            config.cache.translation_capacity,
            translation_loader,
        )?;

        Ok(Self {
            config,
            speech_models,
            chat_models,
            translators,
        })
    }

    /// Get runtime configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn resident_models(&self) -> ResidentModels {
        fn names(keys: Vec<crate::model::ModelKey>) -> Vec<String> {
            keys.into_iter().map(String::from).collect()
        }

        ResidentModels {
            speech: names(self.speech_models.resident_keys().await),
            chat: names(self.chat_models.resident_keys().await),
            translation: names(self.translators.resident_keys().await),
        }
    }

    /// Release every resident model.
    pub async fn shutdown(&self) {
        info!("Releasing resident models");
        self.speech_models.clear().await;
        self.chat_models.clear().await;
        self.translators.clear().await;
    }
}
