//! Collaborator interfaces for model loading and inference.
//!
//! The runtime never touches weights or tokenizers directly. Everything
//! model-specific sits behind these traits; [`sidecar`] implements them
//! against an external model-serving process.

pub mod sidecar;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::language::LanguageTag;
use crate::model::{DeviceKind, ModelKey};

pub use sidecar::{SidecarBackend, SidecarClient};

/// Loads and releases model handles for a [`crate::model::ModelCache`].
#[async_trait]
pub trait ModelLoader<H>: Send + Sync {
    async fn load(&self, key: &ModelKey) -> Result<H>;

    /// Free the resources behind `handle`. Called exactly once per evicted handle.
    async fn release(&self, key: &ModelKey, handle: H) -> Result<()>;
}

/// Output of a batched speech generation call.
#[derive(Debug, Clone, Default)]
pub struct BatchedAudio {
    /// One padded sample sequence per prompt, in prompt order.
    pub sequences: Vec<Vec<f32>>,
    /// Number of valid samples at the start of each sequence.
    pub lengths: Vec<usize>,
}

/// A loaded text-to-speech model together with its prompt and description tokenizers.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    fn sampling_rate(&self) -> u32;

    fn device(&self) -> DeviceKind;

    async fn generate(&self, prompt: &str, description: &str) -> Result<Vec<f32>>;

    async fn generate_batch(
        &self,
        prompts: &[String],
        descriptions: &[String],
        seed: u64,
    ) -> Result<BatchedAudio>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub do_sample: bool,
}

/// A loaded instruction-tuned language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn device(&self) -> DeviceKind;

    /// Apply the chat template to `messages` and return only the newly generated text.
    async fn generate(&self, messages: &[ChatMessage], params: &SamplingParams) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationParams {
    pub max_length: usize,
    pub num_beams: usize,
}

/// A loaded machine translation model.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    fn device(&self) -> DeviceKind;

    /// Translate each text; the output has one entry per input, in order.
    async fn translate(
        &self,
        texts: &[String],
        source: &LanguageTag,
        target: &LanguageTag,
        params: &TranslationParams,
    ) -> Result<Vec<String>>;
}

pub type SpeechHandle = Box<dyn SpeechModel>;
pub type ChatHandle = Box<dyn ChatModel>;
pub type TranslationHandle = Box<dyn TranslationModel>;
