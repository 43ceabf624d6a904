//! Translation runtime methods.

use tracing::debug;

use crate::backends::TranslationParams;
use crate::error::{Error, Result};
use crate::language::LanguageTag;
use crate::model::ModelKey;
use crate::runtime::service::InferenceEngine;
use crate::runtime::types::{Translation, TranslationRequest};

impl InferenceEngine {
    /// Translate a single text between two languages, one side of which must
    /// be the pivot language.
    pub async fn translate(&self, request: TranslationRequest) -> Result<Translation> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("Text cannot be empty".to_string()));
        }
        let source = LanguageTag::parse(request.source_lang.as_str())?;
        let target = LanguageTag::parse(request.target_lang.as_str())?;

        self.translate_text(text, &source, &target).await
    }

    pub(crate) async fn translate_text(
        &self,
        text: &str,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<Translation> {
        let Some(key) = self.translation_model_for(source, target)? else {
            debug!("Skipping translation {} -> {}", source, target);
            return Ok(Translation {
                text: text.to_string(),
                model: None,
            });
        };

        let model = self.translators.acquire(&key).await?;
        let params = TranslationParams {
            max_length: self.config.translation.max_length,
            num_beams: self.config.translation.num_beams,
        };
        let mut output = model
            .translate(&[text.to_string()], source, target, &params)
            .await?;
        if output.len() != 1 {
            return Err(Error::Backend(format!(
                "translation returned {} texts for one input",
                output.len()
            )));
        }

        Ok(Translation {
            text: output.remove(0),
            model: Some(key),
        })
    }

    /// Pick the translation model for a direction. `None` means the texts
    /// are already in the target language.
    pub(crate) fn translation_model_for(
        &self,
        source: &LanguageTag,
        target: &LanguageTag,
    ) -> Result<Option<ModelKey>> {
        if source == target {
            return Ok(None);
        }

        let translation = &self.config.translation;
        let pivot = translation.pivot_language.as_str();
        let model = if target.as_str() == pivot {
            &translation.to_pivot_model
        } else if source.as_str() == pivot {
            &translation.from_pivot_model
        } else {
            return Err(Error::UnsupportedLanguagePair {
                from: source.to_string(),
                to: target.to_string(),
            });
        };

        ModelKey::parse(model.as_str()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{engine, Fakes};

    fn tag(raw: &str) -> LanguageTag {
        LanguageTag::parse(raw).unwrap()
    }

    fn request(text: &str, source: &str, target: &str) -> TranslationRequest {
        TranslationRequest {
            text: text.to_string(),
            source_lang: source.to_string(),
            target_lang: target.to_string(),
        }
    }

    #[test]
    fn routes_by_direction() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);
        let translation = &engine.config().translation;

        let to_pivot = engine
            .translation_model_for(&tag("kan_Knda"), &tag("eng_Latn"))
            .unwrap();
        let from_pivot = engine
            .translation_model_for(&tag("eng_Latn"), &tag("hin_Deva"))
            .unwrap();

        assert_eq!(to_pivot.unwrap().as_str(), translation.to_pivot_model);
        assert_eq!(from_pivot.unwrap().as_str(), translation.from_pivot_model);
        assert!(engine
            .translation_model_for(&tag("eng_Latn"), &tag("eng_Latn"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn pair_without_pivot_is_unsupported() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);

        let err = engine
            .translation_model_for(&tag("kan_Knda"), &tag("hin_Deva"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguagePair { .. }));
    }

    #[tokio::test]
    async fn translates_with_beam_parameters() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);

        let out = engine
            .translate(request(" ನಮಸ್ಕಾರ ", "kan_Knda", "eng_Latn"))
            .await
            .unwrap();

        assert_eq!(out.text, "[kan_Knda->eng_Latn] ನಮಸ್ಕಾರ");
        let calls = fakes.translator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, engine.config().translation.to_pivot_model);
        assert_eq!(calls[0].texts, vec!["ನಮಸ್ಕಾರ"]);
        assert_eq!((calls[0].source.as_str(), calls[0].target.as_str()), ("kan_Knda", "eng_Latn"));
        assert_eq!(calls[0].params.num_beams, 5);
        assert_eq!(calls[0].params.max_length, 256);
    }

    #[tokio::test]
    async fn rejects_blank_text_and_tags() {
        let fakes = Fakes::default();
        let engine = engine(&fakes);

        assert!(engine
            .translate(request("", "kan_Knda", "eng_Latn"))
            .await
            .unwrap_err()
            .is_invalid_input());
        assert!(engine
            .translate(request("hi", " ", "eng_Latn"))
            .await
            .unwrap_err()
            .is_invalid_input());
        assert!(fakes.loads().is_empty());
    }
}
