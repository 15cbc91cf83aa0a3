// Gemini REST client for batch text translation

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::core::config::GeminiConfig;
use crate::core::errors::{TranslationError, TranslationResult};
use crate::services::translation::{parse_translations, TranslationClient};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Request payload embedded in the prompt so the model sees the exact block
/// structure it must mirror.
#[derive(Debug, Serialize)]
struct PromptPayload<'a> {
    target_language: &'a str,
    blocks: Vec<PromptBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct PromptBlock<'a> {
    text: &'a str,
}

pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> TranslationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { config, http_client })
    }

    fn build_prompt(&self, source_texts: &[String], target_language: &str) -> String {
        let payload = PromptPayload {
            target_language,
            blocks: source_texts
                .iter()
                .map(|text| PromptBlock { text })
                .collect(),
        };
        // Serialization of a struct of strings cannot fail
        let payload_json = serde_json::to_string(&payload).unwrap_or_default();

        format!(
            "You are an expert manga translator. Translate each block of text to {target_language}. \
             Respond with a JSON array of strings matching the length of the provided blocks. Each array \
             element must correspond to the block at the same index. Do not add numbering or extra text.\n\n\
             Input JSON:\n{payload_json}"
        )
    }
}

#[async_trait]
impl TranslationClient for GeminiClient {
    async fn translate(
        &self,
        source_texts: &[String],
        target_language: &str,
    ) -> TranslationResult<Vec<String>> {
        let prompt = self.build_prompt(source_texts, target_language);
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_ENDPOINT, self.config.model, self.config.api_key
        );

        let request_body = serde_json::json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        });

        debug!("Translating batch of {} blocks via {}", source_texts.len(), self.config.model);

        let response = self.http_client.post(&url).json(&request_body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::BadStatus {
                status: status.as_u16(),
                body: truncate(&body, 400),
            });
        }

        let body: serde_json::Value = response.json().await?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                TranslationError::MalformedResponse("missing candidates[0].content.parts[0].text".into())
            })?;

        parse_translations(text, source_texts.len())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
