//! In-process fakes for the model collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backends::{
    BatchedAudio, ChatHandle, ChatMessage, ChatModel, ChatRole, ModelLoader, SamplingParams,
    SpeechHandle, SpeechModel, TranslationHandle, TranslationModel, TranslationParams,
};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::language::LanguageTag;
use crate::model::{DeviceKind, ModelKey};
use crate::runtime::InferenceEngine;
use crate::text::word_count;

/// Records every load and hands out handles backed by shared fakes.
#[derive(Clone, Default)]
pub(crate) struct Fakes {
    pub speech: Arc<FakeSpeech>,
    pub chat: Arc<FakeChat>,
    pub translator: Arc<FakeTranslator>,
    loads: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
}

impl Fakes {
    pub fn failing_loads(keys: &[&str]) -> Self {
        Self {
            failing: Arc::new(keys.iter().map(|k| k.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    fn record_load(&self, key: &ModelKey) -> Result<()> {
        self.loads.lock().unwrap().push(key.to_string());
        if self.failing.contains(key.as_str()) {
            return Err(Error::Backend(format!("cannot load {key}")));
        }
        Ok(())
    }
}

pub(crate) fn engine(fakes: &Fakes) -> InferenceEngine {
    engine_with(EngineConfig::default(), fakes)
}

pub(crate) fn engine_with(config: EngineConfig, fakes: &Fakes) -> InferenceEngine {
    let loader = Arc::new(fakes.clone());
    InferenceEngine::with_loaders(config, loader.clone(), loader.clone(), loader).unwrap()
}

#[async_trait]
impl ModelLoader<SpeechHandle> for Fakes {
    async fn load(&self, key: &ModelKey) -> Result<SpeechHandle> {
        self.record_load(key)?;
        Ok(Box::new(Handle(self.speech.clone(), key.clone())))
    }

    async fn release(&self, _key: &ModelKey, _handle: SpeechHandle) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ModelLoader<ChatHandle> for Fakes {
    async fn load(&self, key: &ModelKey) -> Result<ChatHandle> {
        self.record_load(key)?;
        Ok(Box::new(Handle(self.chat.clone(), key.clone())))
    }

    async fn release(&self, _key: &ModelKey, _handle: ChatHandle) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ModelLoader<TranslationHandle> for Fakes {
    async fn load(&self, key: &ModelKey) -> Result<TranslationHandle> {
        self.record_load(key)?;
        Ok(Box::new(Handle(self.translator.clone(), key.clone())))
    }

    async fn release(&self, _key: &ModelKey, _handle: TranslationHandle) -> Result<()> {
        Ok(())
    }
}

/// A handle that knows which key it was loaded under.
pub(crate) struct Handle<T>(Arc<T>, ModelKey);

type BatchCall = (Vec<String>, Vec<String>, u64);

/// Emits one sample per word. Single-pass samples are `0.5`; batched chunk
/// `i` is filled with `i + 1` and padded with a `9.0` outside its length.
#[derive(Default)]
pub(crate) struct FakeSpeech {
    single: Mutex<Vec<(String, String)>>,
    batches: Mutex<Vec<BatchCall>>,
    failing: AtomicBool,
}

impl FakeSpeech {
    pub const SAMPLE_RATE: u32 = 16_000;

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn single_calls(&self) -> Vec<(String, String)> {
        self.single.lock().unwrap().clone()
    }

    pub fn batch_calls(&self) -> Vec<BatchCall> {
        self.batches.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Backend("speech generation failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechModel for Handle<FakeSpeech> {
    fn sampling_rate(&self) -> u32 {
        FakeSpeech::SAMPLE_RATE
    }

    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    async fn generate(&self, prompt: &str, description: &str) -> Result<Vec<f32>> {
        self.0
            .single
            .lock()
            .unwrap()
            .push((prompt.to_string(), description.to_string()));
        self.0.check()?;
        Ok(vec![0.5; word_count(prompt)])
    }

    async fn generate_batch(
        &self,
        prompts: &[String],
        descriptions: &[String],
        seed: u64,
    ) -> Result<BatchedAudio> {
        self.0
            .batches
            .lock()
            .unwrap()
            .push((prompts.to_vec(), descriptions.to_vec(), seed));
        self.0.check()?;

        let mut batch = BatchedAudio::default();
        for (index, prompt) in prompts.iter().enumerate() {
            let words = word_count(prompt);
            let mut sequence = vec![(index + 1) as f32; words];
            sequence.push(9.0);
            batch.sequences.push(sequence);
            batch.lengths.push(words);
        }
        Ok(batch)
    }
}

/// Replies with `reply: <last user message>`.
#[derive(Default)]
pub(crate) struct FakeChat {
    calls: Mutex<Vec<(Vec<ChatMessage>, SamplingParams)>>,
    failing: AtomicBool,
}

impl FakeChat {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Vec<ChatMessage>, SamplingParams)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for Handle<FakeChat> {
    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    async fn generate(&self, messages: &[ChatMessage], params: &SamplingParams) -> Result<String> {
        self.0
            .calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), params.clone()));
        if self.0.failing.load(Ordering::SeqCst) {
            return Err(Error::Backend("generation failed".to_string()));
        }
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("reply: {user}"))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TranslateCall {
    pub model: String,
    pub texts: Vec<String>,
    pub source: String,
    pub target: String,
    pub params: TranslationParams,
}

/// Prefixes each text with `[source->target]`.
#[derive(Default)]
pub(crate) struct FakeTranslator {
    calls: Mutex<Vec<TranslateCall>>,
    failing_models: Mutex<HashSet<String>>,
}

impl FakeTranslator {
    pub fn fail_model(&self, model: &str) {
        self.failing_models.lock().unwrap().insert(model.to_string());
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationModel for Handle<FakeTranslator> {
    fn device(&self) -> DeviceKind {
        DeviceKind::Cpu
    }

    async fn translate(
        &self,
        texts: &[String],
        source: &LanguageTag,
        target: &LanguageTag,
        params: &TranslationParams,
    ) -> Result<Vec<String>> {
        self.0.calls.lock().unwrap().push(TranslateCall {
            model: self.1.to_string(),
            texts: texts.to_vec(),
            source: source.to_string(),
            target: target.to_string(),
            params: params.clone(),
        });
        if self.0.failing_models.lock().unwrap().contains(self.1.as_str()) {
            return Err(Error::Backend(format!("{} failed", self.1)));
        }
        Ok(texts
            .iter()
            .map(|text| format!("[{source}->{target}] {text}"))
            .collect())
    }
}
