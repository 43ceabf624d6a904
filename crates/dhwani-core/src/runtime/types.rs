//! Runtime request/response types.

use serde::{Deserialize, Serialize};

use crate::model::ModelKey;

/// Request for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    /// Text to synthesize
    pub text: String,

    /// Natural-language description of the speaker. Empty means the
    /// configured default voice.
    #[serde(default)]
    pub voice_description: String,

    /// Speech model to use
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Number of text chunks the input was split into.
    pub chunk_count: usize,
    pub model: ModelKey,
    pub generation_time_ms: f64,
}

impl SynthesizedSpeech {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Real-time factor: generation time over audio duration.
    pub fn rtf(&self) -> f32 {
        let duration = self.duration_secs();
        if duration > 0.0 {
            (self.generation_time_ms as f32 / 1000.0) / duration
        } else {
            0.0
        }
    }
}

/// Request for the translate, generate, translate chat pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone)]
pub struct ChatAnswer {
    /// Response in the target language.
    pub text: String,
    pub generation_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    /// Translation model used, or `None` when source and target match the pivot.
    pub model: Option<ModelKey>,
}
