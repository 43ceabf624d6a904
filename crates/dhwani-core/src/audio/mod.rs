//! Audio container encoding for synthesized speech.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use flacenc::component::BitRepr;
use flacenc::error::Verify;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 16-bit PCM WAV
    Wav,
    /// Raw little-endian 16-bit PCM
    Pcm,
    /// Raw little-endian 32-bit float
    RawF32,
    Mp3,
    Opus,
    Aac,
    /// 16-bit FLAC
    Flac,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
            AudioFormat::RawF32 => "raw_f32",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
        }
    }

    /// Whether [`AudioEncoder`] can produce this format.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            AudioFormat::Wav | AudioFormat::Pcm | AudioFormat::RawF32 | AudioFormat::Flac
        )
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "pcm" | "raw_i16" | "pcm_i16" => Ok(AudioFormat::Pcm),
            "raw_f32" | "pcm_f32" => Ok(AudioFormat::RawF32),
            "mp3" => Ok(AudioFormat::Mp3),
            "opus" => Ok(AudioFormat::Opus),
            "aac" => Ok(AudioFormat::Aac),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioEncoder {
    sample_rate: u32,
    channels: u16,
}

impl AudioEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn encode(&self, samples: &[f32], format: AudioFormat) -> Result<Vec<u8>> {
        match format {
            AudioFormat::Wav => self.encode_wav(samples),
            AudioFormat::Pcm => Ok(samples
                .iter()
                .flat_map(|s| to_i16(*s).to_le_bytes())
                .collect()),
            AudioFormat::RawF32 => Ok(samples
                .iter()
                .flat_map(|s| sanitize(*s).to_le_bytes())
                .collect()),
            AudioFormat::Flac => self.encode_flac(samples),
            other => Err(Error::UnsupportedFormat(format!(
                "{other} encoding is not available; use wav, flac, pcm or raw_f32"
            ))),
        }
    }

    fn encode_wav(&self, samples: &[f32]) -> Result<Vec<u8>> {
        if self.sample_rate == 0 {
            return Err(Error::AudioEncoding("sample rate must be positive".to_string()));
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in samples {
                writer.write_sample(to_i16(*sample))?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    fn encode_flac(&self, samples: &[f32]) -> Result<Vec<u8>> {
        if self.sample_rate == 0 {
            return Err(Error::AudioEncoding("sample rate must be positive".to_string()));
        }

        let pcm: Vec<i32> = samples.iter().map(|s| i32::from(to_i16(*s))).collect();
        let config = flacenc::config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| Error::AudioEncoding(format!("FLAC config: {e:?}")))?;
        let source = flacenc::source::MemSource::from_samples(
            &pcm,
            usize::from(self.channels),
            16,
            self.sample_rate as usize,
        );
        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| Error::AudioEncoding(format!("FLAC encode: {e:?}")))?;

        let mut sink = flacenc::bitsink::ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| Error::AudioEncoding(format!("FLAC write: {e:?}")))?;
        Ok(sink.as_slice().to_vec())
    }

    pub fn content_type(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Pcm | AudioFormat::RawF32 => "application/octet-stream",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Flac => "audio/flac",
        }
    }
}

fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

fn to_i16(sample: f32) -> i16 {
    (sanitize(sample) * i16::MAX as f32).round() as i16
}
