//! Text-to-speech runtime methods.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backends::{BatchedAudio, SpeechModel};
use crate::error::{Error, Result};
use crate::model::ModelKey;
use crate::runtime::service::InferenceEngine;
use crate::runtime::types::{SpeechRequest, SynthesizedSpeech};
use crate::text::chunk_text;

impl InferenceEngine {
    /// Synthesize `request.text`, splitting long inputs into word chunks that
    /// are generated as one batch and stitched back together in order.
    pub async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedSpeech> {
        if request.text.trim().is_empty() {
            return Err(Error::InvalidInput("Input text cannot be empty".to_string()));
        }
        let key = ModelKey::parse(request.model.as_str())?;
        let description = if request.voice_description.trim().is_empty() {
            self.config.synthesis.default_voice.clone()
        } else {
            request.voice_description
        };

        let started = Instant::now();
        let model = self.speech_models.acquire(&key).await?;

        let chunks = chunk_text(&request.text, self.config.synthesis.chunk_size)?;
        debug!("Split input into {} chunks on {}", chunks.len(), model.device());

        let samples = if chunks.len() <= self.config.synthesis.single_pass_max_chunks {
            model
                .generate(&request.text, &description)
                .await
                .map_err(Error::synthesis)?
        } else {
            self.generate_chunked(&**model, &chunks, &description)
                .await
                .map_err(Error::synthesis)?
        };

        let speech = SynthesizedSpeech {
            samples,
            sample_rate: model.sampling_rate(),
            chunk_count: chunks.len(),
            model: key,
            generation_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            "Synthesized {:.2}s of audio from {} chunks in {:.0} ms (RTF {:.2})",
            speech.duration_secs(),
            speech.chunk_count,
            speech.generation_time_ms,
            speech.rtf()
        );
        Ok(speech)
    }

    async fn generate_chunked(
        &self,
        model: &dyn SpeechModel,
        chunks: &[String],
        description: &str,
    ) -> Result<Vec<f32>> {
        let descriptions = vec![description.to_string(); chunks.len()];
        let batch = model
            .generate_batch(chunks, &descriptions, self.config.synthesis.sampling_seed)
            .await?;
        stitch(batch, chunks.len())
    }
}

/// Truncate each padded sequence to its valid length and concatenate in order.
fn stitch(batch: BatchedAudio, expected: usize) -> Result<Vec<f32>> {
    let BatchedAudio { sequences, lengths } = batch;
    if sequences.len() != expected || lengths.len() != expected {
        return Err(Error::Backend(format!(
            "batched generation returned {} sequences and {} lengths for {} chunks",
            sequences.len(),
            lengths.len(),
            expected
        )));
    }

    let total: usize = sequences
        .iter()
        .zip(&lengths)
        .map(|(seq, len)| (*len).min(seq.len()))
        .sum();
    let mut samples = Vec::with_capacity(total);
    for (index, (sequence, length)) in sequences.into_iter().zip(lengths).enumerate() {
        if length > sequence.len() {
            warn!(
                "Chunk {} reports {} valid samples but has {}",
                index,
                length,
                sequence.len()
            );
        }
        let valid = length.min(sequence.len());
        samples.extend_from_slice(&sequence[..valid]);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{engine, FakeSpeech, Fakes};

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.to_string(),
            voice_description: "calm voice".to_string(),
            model: "parler".to_string(),
        }
    }

    #[test]
    fn stitch_truncates_and_clamps() {
        let batch = BatchedAudio {
            sequences: vec![vec![1.0, 1.0, 0.0], vec![2.0], vec![3.0, 3.0]],
            lengths: vec![2, 5, 0],
        };
        assert_eq!(stitch(batch, 3).unwrap(), vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn stitch_rejects_size_mismatch() {
        let batch = BatchedAudio {
            sequences: vec![vec![1.0]],
            lengths: vec![1],
        };
        assert!(stitch(batch, 2).is_err());
    }

    #[tokio::test]
    async fn multi_chunk_text_is_batched_in_order() {
        let fakes = Fakes::default();
        let mut engine = engine(&fakes);
        engine.config.synthesis.chunk_size = 2;

        let speech = engine
            .synthesize(request("one two three four five"))
            .await
            .unwrap();

        // FakeSpeech emits one sample per word, valued by chunk index + 1,
        // padded with a trailing 9.0 that the reported length excludes.
        assert_eq!(speech.samples, vec![1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(speech.chunk_count, 3);
        assert_eq!(speech.sample_rate, FakeSpeech::SAMPLE_RATE);

        let calls = fakes.speech.batch_calls();
        assert_eq!(calls.len(), 1);
        let (prompts, descriptions, seed) = &calls[0];
        assert_eq!(prompts, &vec!["one two", "three four", "five"]);
        assert_eq!(descriptions, &vec!["calm voice"; 3]);
        assert_eq!(*seed, 0);
        assert!(fakes.speech.single_calls().is_empty());
    }

    #[tokio::test]
    async fn short_text_uses_single_pass() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);

        let speech = engine.synthesize(request("hello there")).await.unwrap();

        assert_eq!(speech.chunk_count, 1);
        assert_eq!(speech.samples, vec![0.5, 0.5]);
        assert_eq!(
            fakes.speech.single_calls(),
            vec![("hello there".to_string(), "calm voice".to_string())]
        );
        assert!(fakes.speech.batch_calls().is_empty());
    }

    #[tokio::test]
    async fn blank_voice_uses_default_description() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);
        let mut req = request("hi");
        req.voice_description = "  ".to_string();

        engine.synthesize(req).await.unwrap();

        let default_voice = engine.config().synthesis.default_voice.clone();
        assert_eq!(fakes.speech.single_calls()[0].1, default_voice);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_loading() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);

        let err = engine.synthesize(request("   ")).await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(fakes.loads().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_wrapped() {
        let fakes = Fakes::default();
        fakes.speech.fail();
        let engine = engine(&fakes);

        let err = engine.synthesize(request("hello")).await.unwrap_err();

        match err {
            Error::Synthesis { source } => assert!(matches!(*source, Error::Backend(_))),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn load_failure_is_reported_as_model_load() {
        let fakes = Fakes::failing_loads(&["parler"]);
        let engine = engine(&fakes);

        let err = engine.synthesize(request("hello")).await.unwrap_err();

        assert!(matches!(err, Error::ModelLoad { ref key, .. } if key == "parler"));
        assert!(fakes.speech.single_calls().is_empty());
    }
}
