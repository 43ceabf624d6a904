//! HTTP bridge to the model-serving sidecar.
//!
//! The sidecar owns weights, tokenizers and devices. Models are addressed by
//! `(kind, model)`; every reply is a JSON object that either carries the
//! payload or an `error` string. Audio travels as base64-encoded
//! little-endian `f32` samples.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backends::{
    BatchedAudio, ChatHandle, ChatMessage, ChatModel, ModelLoader, SamplingParams, SpeechHandle,
    SpeechModel, TranslationHandle, TranslationModel, TranslationParams,
};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::language::LanguageTag;
use crate::model::{DeviceKind, ModelKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Speech,
    Chat,
    Translation,
}

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    kind: ModelKind,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    sampling_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
struct UnloadRequest<'a> {
    kind: ModelKind,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct UnloadResponse {}

#[derive(Debug, Serialize)]
struct SpeechGenerateRequest<'a> {
    model: &'a str,
    prompts: &'a [String],
    descriptions: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    do_sample: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SpeechGenerateResponse {
    audios: Vec<String>,
    #[serde(default)]
    lengths: Option<Vec<usize>>,
}

#[derive(Debug, Serialize)]
struct ChatGenerateRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_new_tokens: usize,
    temperature: f32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct ChatGenerateResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    src_lang: &'a str,
    tgt_lang: &'a str,
    max_length: usize,
    num_beams: usize,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<String>,
}

/// Thin JSON client for the sidecar API.
#[derive(Debug, Clone)]
pub struct SidecarClient {
    http: reqwest::Client,
    base_url: String,
}

impl SidecarClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("{path} returned {status} with unreadable body: {e}")))?;

        if let Some(message) = body.get("error").and_then(|e| e.as_str()) {
            return Err(Error::Backend(format!("{path}: {message}")));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!("{path} returned {status}")));
        }

        serde_json::from_value(body)
            .map_err(|e| Error::Backend(format!("Malformed {path} response: {e}")))
    }

    async fn load(&self, kind: ModelKind, key: &ModelKey) -> Result<LoadResponse> {
        self.call(
            "models/load",
            &LoadRequest {
                kind,
                model: key.as_str(),
            },
        )
        .await
        .map_err(|err| Error::ModelLoad {
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    async fn unload(&self, kind: ModelKind, key: &ModelKey) -> Result<()> {
        let _: UnloadResponse = self
            .call(
                "models/unload",
                &UnloadRequest {
                    kind,
                    model: key.as_str(),
                },
            )
            .await?;
        Ok(())
    }
}

/// Model loader backed by the sidecar, usable for every model family.
#[derive(Debug, Clone)]
pub struct SidecarBackend {
    client: Arc<SidecarClient>,
}

impl SidecarBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(SidecarClient::new(config)?),
        })
    }

    pub fn client(&self) -> &SidecarClient {
        &self.client
    }
}

fn device_from(response: &LoadResponse) -> DeviceKind {
    response
        .device
        .as_deref()
        .map(DeviceKind::from_label)
        .unwrap_or(DeviceKind::Other)
}

#[async_trait]
impl ModelLoader<SpeechHandle> for SidecarBackend {
    async fn load(&self, key: &ModelKey) -> Result<SpeechHandle> {
        let response = self.client.load(ModelKind::Speech, key).await?;
        let sampling_rate = response
            .sampling_rate
            .filter(|rate| *rate > 0)
            .ok_or_else(|| Error::ModelLoad {
                key: key.to_string(),
                message: "sidecar did not report a sampling rate".to_string(),
            })?;

        Ok(Box::new(SidecarSpeechModel {
            client: self.client.clone(),
            key: key.clone(),
            sampling_rate,
            device: device_from(&response),
        }))
    }

    async fn release(&self, key: &ModelKey, handle: SpeechHandle) -> Result<()> {
        drop(handle);
        self.client.unload(ModelKind::Speech, key).await
    }
}

#[async_trait]
impl ModelLoader<ChatHandle> for SidecarBackend {
    async fn load(&self, key: &ModelKey) -> Result<ChatHandle> {
        let response = self.client.load(ModelKind::Chat, key).await?;
        Ok(Box::new(SidecarChatModel {
            client: self.client.clone(),
            key: key.clone(),
            device: device_from(&response),
        }))
    }

    async fn release(&self, key: &ModelKey, handle: ChatHandle) -> Result<()> {
        drop(handle);
        self.client.unload(ModelKind::Chat, key).await
    }
}

#[async_trait]
impl ModelLoader<TranslationHandle> for SidecarBackend {
    async fn load(&self, key: &ModelKey) -> Result<TranslationHandle> {
        let response = self.client.load(ModelKind::Translation, key).await?;
        Ok(Box::new(SidecarTranslationModel {
            client: self.client.clone(),
            key: key.clone(),
            device: device_from(&response),
        }))
    }

    async fn release(&self, key: &ModelKey, handle: TranslationHandle) -> Result<()> {
        drop(handle);
        self.client.unload(ModelKind::Translation, key).await
    }
}

struct SidecarSpeechModel {
    client: Arc<SidecarClient>,
    key: ModelKey,
    sampling_rate: u32,
    device: DeviceKind,
}

impl SidecarSpeechModel {
    async fn request(
        &self,
        prompts: &[String],
        descriptions: &[String],
        seed: Option<u64>,
    ) -> Result<(Vec<Vec<f32>>, Option<Vec<usize>>)> {
        let response: SpeechGenerateResponse = self
            .client
            .call(
                "speech/generate",
                &SpeechGenerateRequest {
                    model: self.key.as_str(),
                    prompts,
                    descriptions,
                    seed,
                    do_sample: seed.map(|_| true),
                },
            )
            .await?;

        let audios = response
            .audios
            .iter()
            .map(|encoded| decode_samples(encoded))
            .collect::<Result<Vec<_>>>()?;
        Ok((audios, response.lengths))
    }
}

#[async_trait]
impl SpeechModel for SidecarSpeechModel {
    fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    fn device(&self) -> DeviceKind {
        self.device
    }

    async fn generate(&self, prompt: &str, description: &str) -> Result<Vec<f32>> {
        let (mut audios, _) = self
            .request(&[prompt.to_string()], &[description.to_string()], None)
            .await?;
        if audios.len() != 1 {
            return Err(Error::Backend(format!(
                "speech/generate returned {} audios for one prompt",
                audios.len()
            )));
        }
        Ok(audios.remove(0))
    }

    async fn generate_batch(
        &self,
        prompts: &[String],
        descriptions: &[String],
        seed: u64,
    ) -> Result<BatchedAudio> {
        let (sequences, lengths) = self.request(prompts, descriptions, Some(seed)).await?;
        let lengths = lengths.unwrap_or_else(|| sequences.iter().map(Vec::len).collect());
        Ok(BatchedAudio { sequences, lengths })
    }
}

struct SidecarChatModel {
    client: Arc<SidecarClient>,
    key: ModelKey,
    device: DeviceKind,
}

#[async_trait]
impl ChatModel for SidecarChatModel {
    fn device(&self) -> DeviceKind {
        self.device
    }

    async fn generate(&self, messages: &[ChatMessage], params: &SamplingParams) -> Result<String> {
        let response: ChatGenerateResponse = self
            .client
            .call(
                "chat/generate",
                &ChatGenerateRequest {
                    model: self.key.as_str(),
                    messages,
                    max_new_tokens: params.max_new_tokens,
                    temperature: params.temperature,
                    do_sample: params.do_sample,
                },
            )
            .await?;
        Ok(response.text)
    }
}

struct SidecarTranslationModel {
    client: Arc<SidecarClient>,
    key: ModelKey,
    device: DeviceKind,
}

#[async_trait]
impl TranslationModel for SidecarTranslationModel {
    fn device(&self) -> DeviceKind {
        self.device
    }

    async fn translate(
        &self,
        texts: &[String],
        source: &LanguageTag,
        target: &LanguageTag,
        params: &TranslationParams,
    ) -> Result<Vec<String>> {
        let response: TranslateResponse = self
            .client
            .call(
                "translate",
                &TranslateRequest {
                    model: self.key.as_str(),
                    texts,
                    src_lang: source.as_str(),
                    tgt_lang: target.as_str(),
                    max_length: params.max_length,
                    num_beams: params.num_beams,
                },
            )
            .await?;
        Ok(response.translations)
    }
}

/// Decode base64 little-endian `f32` samples.
pub fn decode_samples(encoded: &str) -> Result<Vec<f32>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Backend(format!("Base64 decode error: {}", e)))?;

    if bytes.len() % 4 != 0 {
        return Err(Error::Backend(format!(
            "Audio payload of {} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Encode samples the way the sidecar sends them.
pub fn encode_samples(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
