//! Chat runtime methods: translate the prompt into the pivot language,
//! generate a reply, translate the reply into the requested language.

use std::time::Instant;

use tracing::{debug, info};

use crate::backends::{ChatMessage, SamplingParams};
use crate::error::{Error, PipelineStage, Result};
use crate::language::LanguageTag;
use crate::model::ModelKey;
use crate::runtime::service::InferenceEngine;
use crate::runtime::types::{ChatAnswer, ChatRequest};

pub const SYSTEM_PROMPT: &str = "You are Dhwani, a helpful assistant. Provide a concise response in one sentence maximum to the user's query.";

impl InferenceEngine {
    pub async fn answer(&self, request: ChatRequest) -> Result<ChatAnswer> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("Prompt cannot be empty".to_string()));
        }
        let max_chars = self.config.chat.max_prompt_chars;
        if prompt.chars().count() > max_chars {
            return Err(Error::InvalidInput(format!(
                "Prompt cannot exceed {max_chars} characters"
            )));
        }
        let source = LanguageTag::parse(request.source_lang.as_str())?;
        let target = LanguageTag::parse(request.target_lang.as_str())?;
        let pivot = LanguageTag::parse(self.config.translation.pivot_language.as_str())?;

        let started = Instant::now();

        let pivot_prompt = self
            .translate_text(prompt, &source, &pivot)
            .await
            .map_err(|err| Error::translation(PipelineStage::A, err, None))?
            .text;
        debug!("Translated prompt: {}", pivot_prompt);

        let reply = self
            .generate_reply(&pivot_prompt)
            .await
            .map_err(|err| Error::generation(PipelineStage::B, err, Some(pivot_prompt.clone())))?;
        debug!("Generated response: {}", reply);

        let text = self
            .translate_text(&reply, &pivot, &target)
            .await
            .map_err(|err| Error::translation(PipelineStage::C, err, Some(reply.clone())))?
            .text;

        let generation_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Answered {} -> {} prompt in {:.0} ms",
            source, target, generation_time_ms
        );

        Ok(ChatAnswer {
            text,
            generation_time_ms,
        })
    }

    async fn generate_reply(&self, prompt: &str) -> Result<String> {
        let key = ModelKey::parse(self.config.chat.model.as_str())?;
        let model = self.chat_models.acquire(&key).await?;

        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let params = SamplingParams {
            max_new_tokens: self.config.chat.max_new_tokens,
            temperature: self.config.chat.temperature,
            do_sample: true,
        };
        model.generate(&messages, &params).await
    }
}
