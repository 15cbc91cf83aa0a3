// Batch translation with resilient fallback
//
// Regions are grouped into size-bounded batches, each batch goes to the
// translation model once, and any call or validation failure degrades that
// batch (and only that batch) to the untranslated source text. Region count
// and order are preserved unconditionally.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::ProcessingConfig;
use crate::core::errors::{TranslationError, TranslationResult};
use crate::core::types::{PageExtraction, PageTranslation, RegionTranslation, TextRegion};

/// Narrow capability seam over the concrete translation model.
///
/// Implementations must return exactly `source_texts.len()` translations in
/// positional order, or an error. [`BatchTranslator`] treats any error as a
/// signal to fall back, never as a reason to abort a page.
#[async_trait]
pub trait TranslationClient: Send + Sync {
    async fn translate(
        &self,
        source_texts: &[String],
        target_language: &str,
    ) -> TranslationResult<Vec<String>>;
}

pub struct BatchTranslator<C: TranslationClient> {
    client: C,
    batch_size: usize,
    max_chars: usize,
}

impl<C: TranslationClient> BatchTranslator<C> {
    pub fn new(client: C, processing: &ProcessingConfig) -> Self {
        Self {
            client,
            batch_size: processing.batch_size,
            max_chars: processing.max_chars_per_batch,
        }
    }

    /// Translate one page's regions.
    ///
    /// Infallible by contract: the output always has the same length and
    /// order as the input, with bbox/confidence passed through untouched.
    pub async fn translate_page(
        &self,
        extraction: &PageExtraction,
        target_language: &str,
    ) -> PageTranslation {
        let mut translated_regions = Vec::with_capacity(extraction.regions.len());
        for batch in chunk_regions(&extraction.regions, self.batch_size, self.max_chars) {
            let translations = self.translate_batch(batch, target_language).await;
            for (region, translated) in batch.iter().zip(translations) {
                translated_regions.push(RegionTranslation {
                    bbox: region.bbox,
                    source_text: region.text.clone(),
                    translated_text: translated,
                    confidence: region.confidence,
                });
            }
        }
        PageTranslation {
            page_index: extraction.page_index,
            image_path: extraction.image_path.clone(),
            regions: translated_regions,
        }
    }

    /// Translate one batch, degrading to the identity fallback on any failure.
    async fn translate_batch(&self, batch: &[TextRegion], target_language: &str) -> Vec<String> {
        let source_texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        match self.client.translate(&source_texts, target_language).await {
            Ok(translations) if translations.len() == batch.len() => {
                debug!("Received translations for {} regions", translations.len());
                translations
            }
            Ok(translations) => {
                warn!(
                    "Falling back to source text: translation count mismatch (batch {}, got {})",
                    batch.len(),
                    translations.len()
                );
                source_texts
            }
            Err(err) => {
                warn!(
                    "Falling back to source text for batch of {}: {}",
                    batch.len(),
                    err
                );
                source_texts
            }
        }
    }
}

/// Group regions into contiguous batches, in order.
///
/// Append-then-check: a batch is flushed once it holds `batch_size` regions or
/// its accumulated character count reaches `max_chars`, so a batch overshoots
/// a limit by at most the single region that tripped it. Concatenating the
/// returned slices reconstructs the input exactly.
pub fn chunk_regions(
    regions: &[TextRegion],
    batch_size: usize,
    max_chars: usize,
) -> Vec<&[TextRegion]> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut char_count = 0;
    for (i, region) in regions.iter().enumerate() {
        char_count += region.text.chars().count();
        if i + 1 - start >= batch_size || char_count >= max_chars {
            batches.push(&regions[start..=i]);
            start = i + 1;
            char_count = 0;
        }
    }
    if start < regions.len() {
        batches.push(&regions[start..]);
    }
    batches
}

/// Extract and validate the model's JSON array response.
///
/// The first `[` and last `]` delimit the payload, tolerating prose around
/// the array from chattier models. The array must decode to exactly
/// `expected` elements; each element is coerced to a trimmed string.
pub fn parse_translations(response_text: &str, expected: usize) -> TranslationResult<Vec<String>> {
    let start = response_text.find('[').ok_or(TranslationError::MissingArray)?;
    let end = response_text.rfind(']').ok_or(TranslationError::MissingArray)?;
    if end < start {
        return Err(TranslationError::MissingArray);
    }

    let payload: Value = serde_json::from_str(&response_text[start..=end])?;
    let items = payload.as_array().ok_or(TranslationError::NotAnArray)?;
    if items.len() != expected {
        return Err(TranslationError::LengthMismatch {
            expected,
            got: items.len(),
        });
    }

    Ok(items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string().trim().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PageExtraction;
    use std::sync::Mutex;

    fn region(text: &str) -> TextRegion {
        TextRegion {
            bbox: [0, 0, 10, 10],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    fn regions(texts: &[&str]) -> Vec<TextRegion> {
        texts.iter().map(|t| region(t)).collect()
    }

    fn page(regions: Vec<TextRegion>) -> PageExtraction {
        PageExtraction {
            page_index: 0,
            image_path: "page.png".into(),
            regions,
        }
    }

    fn processing(batch_size: usize, max_chars: usize) -> ProcessingConfig {
        ProcessingConfig {
            target_language: "he".into(),
            batch_size,
            max_chars_per_batch: max_chars,
        }
    }

    /// Client that replies from a canned queue, one entry per call.
    struct ScriptedClient {
        responses: Mutex<Vec<TranslationResult<Vec<String>>>>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<TranslationResult<Vec<String>>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TranslationClient for ScriptedClient {
        async fn translate(
            &self,
            source_texts: &[String],
            _target_language: &str,
        ) -> TranslationResult<Vec<String>> {
            self.calls.lock().unwrap().push(source_texts.to_vec());
            self.responses.lock().unwrap().remove(0)
        }
    }

    struct FailingClient;

    #[async_trait]
    impl TranslationClient for FailingClient {
        async fn translate(
            &self,
            _source_texts: &[String],
            _target_language: &str,
        ) -> TranslationResult<Vec<String>> {
            Err(TranslationError::MalformedResponse("boom".into()))
        }
    }

    // --- chunk_regions ---

    #[test]
    fn test_chunking_reconstructs_input() {
        let input = regions(&["a", "bb", "ccc", "dddd", "ee", "f", "gg"]);
        for (batch_size, max_chars) in [(1, 6000), (2, 5), (3, 4), (16, 200), (7, 1)] {
            let batches = chunk_regions(&input, batch_size, max_chars);
            let rebuilt: Vec<&str> = batches
                .iter()
                .flat_map(|b| b.iter().map(|r| r.text.as_str()))
                .collect();
            let expected: Vec<&str> = input.iter().map(|r| r.text.as_str()).collect();
            assert_eq!(rebuilt, expected, "batch_size={batch_size} max_chars={max_chars}");
        }
    }

    #[test]
    fn test_chunking_respects_batch_size_trigger() {
        let input = regions(&["a", "b", "c", "d", "e"]);
        let batches = chunk_regions(&input, 2, 6000);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [2, 2, 1]);
    }

    #[test]
    fn test_chunking_flushes_on_char_budget() {
        // 4 + 4 chars reach the 8-char budget on the second region
        let input = regions(&["aaaa", "bbbb", "c"]);
        let batches = chunk_regions(&input, 16, 8);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [2, 1]);
    }

    #[test]
    fn test_chunking_overshoots_by_one_region_at_most() {
        // A single oversized region still lands in exactly one batch
        let input = regions(&[&"x".repeat(5000), "small"]);
        let batches = chunk_regions(&input, 16, 200);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn test_chunking_empty_input() {
        assert!(chunk_regions(&[], 16, 1500).is_empty());
    }

    // --- parse_translations ---

    #[test]
    fn test_parse_tolerates_surrounding_prose() {
        let raw = "Sure! [\"א\",\"ב\"] — done";
        assert_eq!(parse_translations(raw, 2).unwrap(), vec!["א", "ב"]);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_translations("not json", 1),
            Err(TranslationError::MissingArray)
        ));
        assert!(parse_translations("[not, valid, json]", 3).is_err());
    }

    #[test]
    fn test_parse_rejects_length_mismatch() {
        let err = parse_translations("[\"one\",\"two\"]", 3).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::LengthMismatch { expected: 3, got: 2 }
        ));
    }

    #[test]
    fn test_parse_rejects_non_array_payload() {
        assert!(matches!(
            parse_translations("{\"a\": 1} trailing ]", 1),
            Err(TranslationError::MissingArray)
        ));
        assert!(matches!(
            parse_translations("[\"a\"] but count is {\"b\": [1]}", 1),
            Err(_)
        ));
    }

    #[test]
    fn test_parse_coerces_and_trims_elements() {
        let raw = "[\"  padded  \", 42]";
        assert_eq!(parse_translations(raw, 2).unwrap(), vec!["padded", "42"]);
    }

    // --- BatchTranslator ---

    #[tokio::test]
    async fn test_translate_page_maps_positionally() {
        let client = ScriptedClient::new(vec![Ok(vec!["שלום".into(), "להתראות".into()])]);
        let translator = BatchTranslator::new(client, &processing(16, 1500));
        let extraction = page(regions(&["Hi", "Bye"]));

        let translation = translator.translate_page(&extraction, "he").await;

        assert_eq!(translation.regions.len(), 2);
        assert_eq!(translation.regions[0].translated_text, "שלום");
        assert_eq!(translation.regions[1].translated_text, "להתראות");
        assert_eq!(translation.regions[0].source_text, "Hi");
        for (got, want) in translation.regions.iter().zip(extraction.regions.iter()) {
            assert_eq!(got.bbox, want.bbox);
            assert_eq!(got.confidence, want.confidence);
        }
    }

    #[tokio::test]
    async fn test_failed_call_degrades_to_identity() {
        let translator = BatchTranslator::new(FailingClient, &processing(16, 1500));
        let extraction = page(regions(&["Hi", "Bye"]));

        let translation = translator.translate_page(&extraction, "he").await;

        assert_eq!(translation.regions.len(), 2);
        assert_eq!(translation.regions[0].translated_text, "Hi");
        assert_eq!(translation.regions[1].translated_text, "Bye");
    }

    #[tokio::test]
    async fn test_bad_batch_does_not_affect_others() {
        // Two batches of two: first fails, second succeeds
        let client = ScriptedClient::new(vec![
            Err(TranslationError::MalformedResponse("flaky".into())),
            Ok(vec!["ג".into(), "ד".into()]),
        ]);
        let translator = BatchTranslator::new(client, &processing(2, 6000));
        let extraction = page(regions(&["a", "b", "c", "d"]));

        let translation = translator.translate_page(&extraction, "he").await;

        let texts: Vec<&str> = translation
            .regions
            .iter()
            .map(|r| r.translated_text.as_str())
            .collect();
        assert_eq!(texts, ["a", "b", "ג", "ד"]);
    }

    #[tokio::test]
    async fn test_length_mismatch_rejects_whole_batch() {
        // Wrong-length response must not be partially applied
        let client = ScriptedClient::new(vec![Ok(vec!["only-one".into()])]);
        let translator = BatchTranslator::new(client, &processing(16, 1500));
        let extraction = page(regions(&["Hi", "Bye"]));

        let translation = translator.translate_page(&extraction, "he").await;

        assert_eq!(translation.regions[0].translated_text, "Hi");
        assert_eq!(translation.regions[1].translated_text, "Bye");
    }

    #[tokio::test]
    async fn test_batches_sent_in_input_order() {
        let client = ScriptedClient::new(vec![
            Ok(vec!["1".into(), "2".into()]),
            Ok(vec!["3".into(), "4".into()]),
        ]);
        let translator = BatchTranslator::new(client, &processing(2, 6000));
        let extraction = page(regions(&["a", "b", "c", "d"]));

        let translation = translator.translate_page(&extraction, "he").await;

        let calls = translator.client.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(calls[1], vec!["c".to_string(), "d".to_string()]);
        assert_eq!(translation.regions.len(), 4);
    }

    #[tokio::test]
    async fn test_empty_page_yields_empty_translation() {
        let client = ScriptedClient::new(vec![]);
        let translator = BatchTranslator::new(client, &processing(16, 1500));
        let extraction = page(vec![]);

        let translation = translator.translate_page(&extraction, "he").await;

        assert!(translation.regions.is_empty());
        assert_eq!(translation.page_index, 0);
    }
}
