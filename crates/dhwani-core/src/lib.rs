//! Dhwani Core - multilingual speech and chat inference runtime
//!
//! This crate runs Indic text-to-speech and a translate, generate, translate
//! chat pipeline on top of models served by an external sidecar. Loaded
//! models are kept in bounded LRU caches, one per model family.
//!
//! # Example
//!
//! ```ignore
//! use dhwani_core::{EngineConfig, InferenceEngine, SpeechRequest};
//!
//! let engine = InferenceEngine::new(EngineConfig::default())?;
//! let speech = engine
//!     .synthesize(SpeechRequest {
//!         text: "ನಮಸ್ಕಾರ".to_string(),
//!         voice_description: String::new(),
//!         model: "ai4bharat/indic-parler-tts".to_string(),
//!     })
//!     .await?;
//! ```

pub mod audio;
pub mod backends;
pub mod config;
pub mod error;
pub mod language;
pub mod model;
pub mod runtime;
pub mod text;

pub use audio::{AudioEncoder, AudioFormat};
pub use config::EngineConfig;
pub use error::{Error, PipelineStage, Result};
pub use language::LanguageTag;
pub use model::{DeviceKind, ModelCache, ModelKey};
pub use runtime::{
    ChatAnswer, ChatRequest, InferenceEngine, ResidentModels, SpeechRequest, SynthesizedSpeech,
    Translation, TranslationRequest,
};
pub use text::chunk_text;
