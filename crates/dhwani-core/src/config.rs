//! Configuration types for the Dhwani engine

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

/// Resident model limits, one per model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_speech_capacity")]
    pub speech_capacity: usize,

    #[serde(default = "default_chat_capacity")]
    pub chat_capacity: usize,

    /// Two by default so both translation directions stay resident.
    #[serde(default = "default_translation_capacity")]
    pub translation_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            speech_capacity: default_speech_capacity(),
            chat_capacity: default_chat_capacity(),
            translation_capacity: default_translation_capacity(),
        }
    }
}

fn default_speech_capacity() -> usize {
    1
}

fn default_chat_capacity() -> usize {
    1
}

fn default_translation_capacity() -> usize {
    2
}

/// Speech synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Words per chunk when splitting long input
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Inputs with at most this many chunks are generated in one call
    /// without chunking.
    #[serde(default = "default_single_pass_max_chunks")]
    pub single_pass_max_chunks: usize,

    /// Seed for batched generation so identical input gives identical audio
    #[serde(default)]
    pub sampling_seed: u64,

    #[serde(default = "default_speech_model")]
    pub default_model: String,

    #[serde(default = "default_voice")]
    pub default_voice: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            single_pass_max_chunks: default_single_pass_max_chunks(),
            sampling_seed: 0,
            default_model: default_speech_model(),
            default_voice: default_voice(),
        }
    }
}

fn default_chunk_size() -> usize {
    15
}

fn default_single_pass_max_chunks() -> usize {
    1
}

fn default_speech_model() -> String {
    "ai4bharat/indic-parler-tts".to_string()
}

fn default_voice() -> String {
    "A female speaker delivers a slightly expressive and animated speech with a moderate speed \
     and pitch. The recording is of very high quality, with the speaker's voice sounding clear \
     and very close up."
        .to_string()
}

/// Chat generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_chat_model() -> String {
    "Qwen/Qwen2.5-3B-Instruct".to_string()
}

fn default_max_new_tokens() -> usize {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_prompt_chars() -> usize {
    1000
}

/// Translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Working language of the chat model
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,

    /// Model translating any supported language into the pivot language
    #[serde(default = "default_to_pivot_model")]
    pub to_pivot_model: String,

    /// Model translating the pivot language into any supported language
    #[serde(default = "default_from_pivot_model")]
    pub from_pivot_model: String,

    #[serde(default = "default_translation_max_length")]
    pub max_length: usize,

    #[serde(default = "default_num_beams")]
    pub num_beams: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            pivot_language: default_pivot_language(),
            to_pivot_model: default_to_pivot_model(),
            from_pivot_model: default_from_pivot_model(),
            max_length: default_translation_max_length(),
            num_beams: default_num_beams(),
        }
    }
}

fn default_pivot_language() -> String {
    "eng_Latn".to_string()
}

fn default_to_pivot_model() -> String {
    "ai4bharat/indictrans2-indic-en-dist-200M".to_string()
}

fn default_from_pivot_model() -> String {
    "ai4bharat/indictrans2-en-indic-dist-200M".to_string()
}

fn default_translation_max_length() -> usize {
    256
}

fn default_num_beams() -> usize {
    5
}

/// Inference sidecar connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    300
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing fields use defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply `DHWANI_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    pub(crate) fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("DHWANI_SPEECH_CACHE_CAPACITY") {
            self.cache.speech_capacity = parse_env("DHWANI_SPEECH_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = get("DHWANI_CHAT_CACHE_CAPACITY") {
            self.cache.chat_capacity = parse_env("DHWANI_CHAT_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = get("DHWANI_TRANSLATION_CACHE_CAPACITY") {
            self.cache.translation_capacity =
                parse_env("DHWANI_TRANSLATION_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = get("DHWANI_CHUNK_SIZE") {
            self.synthesis.chunk_size = parse_env("DHWANI_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("DHWANI_SINGLE_PASS_MAX_CHUNKS") {
            self.synthesis.single_pass_max_chunks =
                parse_env("DHWANI_SINGLE_PASS_MAX_CHUNKS", &v)?;
        }
        if let Some(v) = get("DHWANI_SAMPLING_SEED") {
            self.synthesis.sampling_seed = parse_env("DHWANI_SAMPLING_SEED", &v)?;
        }
        if let Some(v) = get("DHWANI_TTS_MODEL") {
            self.synthesis.default_model = v;
        }
        if let Some(v) = get("DHWANI_MODEL_NAME") {
            self.chat.model = v;
        }
        if let Some(v) = get("DHWANI_MAX_TOKENS") {
            self.chat.max_new_tokens = parse_env("DHWANI_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("DHWANI_TEMPERATURE") {
            self.chat.temperature = parse_env("DHWANI_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("DHWANI_PIVOT_LANGUAGE") {
            self.translation.pivot_language = v;
        }
        if let Some(v) = get("DHWANI_BACKEND_URL") {
            self.backend.url = v;
        }
        if let Some(v) = get("DHWANI_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_env("DHWANI_BACKEND_TIMEOUT_SECS", &v)?;
        }

        Ok(self)
    }

    /// Reject settings the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cache.speech_capacity", self.cache.speech_capacity),
            ("cache.chat_capacity", self.cache.chat_capacity),
            ("cache.translation_capacity", self.cache.translation_capacity),
            ("synthesis.chunk_size", self.synthesis.chunk_size),
            ("chat.max_new_tokens", self.chat.max_new_tokens),
            ("chat.max_prompt_chars", self.chat.max_prompt_chars),
            ("translation.max_length", self.translation.max_length),
            ("translation.num_beams", self.translation.num_beams),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be at least 1")));
            }
        }

        if !(self.chat.temperature.is_finite() && self.chat.temperature > 0.0) {
            return Err(Error::Config(format!(
                "chat.temperature must be greater than 0, got {}",
                self.chat.temperature
            )));
        }

        let non_empty = [
            ("synthesis.default_model", &self.synthesis.default_model),
            ("chat.model", &self.chat.model),
            ("translation.pivot_language", &self.translation.pivot_language),
            ("translation.to_pivot_model", &self.translation.to_pivot_model),
            ("translation.from_pivot_model", &self.translation.from_pivot_model),
            ("backend.url", &self.backend.url),
        ];
        for (name, value) in non_empty {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} cannot be empty")));
            }
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Config(format!("Invalid value for {name}: '{raw}'")))
}
