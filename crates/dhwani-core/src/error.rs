//! Error types for the Dhwani core.

use std::fmt;

use thiserror::Error;

/// Leg of the translate -> generate -> translate chat pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Source language to pivot language translation.
    A,
    /// Generation in the pivot language.
    B,
    /// Pivot language to target language translation.
    C,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::A => "A",
            PipelineStage::B => "B",
            PipelineStage::C => "C",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty input, rejected before any collaborator call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The model loader could not produce a handle; the cache is unchanged.
    #[error("Failed to load model {key}: {message}")]
    ModelLoad { key: String, message: String },

    #[error("Translation failed at stage {stage}: {source}")]
    Translation {
        stage: PipelineStage,
        #[source]
        source: Box<Error>,
        /// Output of the last successful stage, kept for diagnostics.
        partial: Option<String>,
    },

    #[error("Generation failed at stage {stage}: {source}")]
    Generation {
        stage: PipelineStage,
        #[source]
        source: Box<Error>,
        partial: Option<String>,
    },

    /// Speech generation failed; no partial audio is returned.
    #[error("Speech synthesis failed: {source}")]
    Synthesis {
        #[source]
        source: Box<Error>,
    },

    #[error("Unsupported language pair: {from} -> {to}")]
    UnsupportedLanguagePair { from: String, to: String },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Failure reported by, or while talking to, the inference backend.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Audio encoding error: {0}")]
    AudioEncoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn translation(stage: PipelineStage, source: Error, partial: Option<String>) -> Self {
        Error::Translation {
            stage,
            source: Box::new(source),
            partial,
        }
    }

    pub fn generation(stage: PipelineStage, source: Error, partial: Option<String>) -> Self {
        Error::Generation {
            stage,
            source: Box::new(source),
            partial,
        }
    }

    pub fn synthesis(source: Error) -> Self {
        Error::Synthesis {
            source: Box::new(source),
        }
    }

    /// Pipeline stage that produced this error, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Error::Translation { stage, .. } | Error::Generation { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Intermediate pipeline output preserved on a stage failure.
    pub fn partial(&self) -> Option<&str> {
        match self {
            Error::Translation { partial, .. } | Error::Generation { partial, .. } => {
                partial.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::UnsupportedLanguagePair { .. }
                | Error::UnsupportedFormat(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Backend(err.to_string())
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Self {
        Error::AudioEncoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
