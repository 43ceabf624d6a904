//! Runtime orchestration layer.
//!
//! [`InferenceEngine`] owns one model cache per family and runs the request
//! pipelines on top of them.

mod chat;
mod service;
mod translate;
mod tts;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::SYSTEM_PROMPT;
pub use service::{InferenceEngine, ResidentModels};
pub use types::{
    ChatAnswer, ChatRequest, SpeechRequest, SynthesizedSpeech, Translation, TranslationRequest,
};
