// High-level orchestration: extractor -> translator -> renderer -> bundler
//
// Pages flow strictly in order; translation falls back per batch inside the
// translator and never fails a page, so the only fatal paths here are OCR,
// I/O, rendering, and bundling.

use std::path::PathBuf;
use tracing::info;

use crate::core::config::Config;
use crate::core::errors::{ConfigError, PipelineError, PipelineResult};
use crate::core::types::{PageTranslation, RenderedPage, TranslationJob};
use crate::services::bundler::bundle_pdf;
use crate::services::ocr::OcrService;
use crate::services::rendering::PageRenderer;
use crate::services::translation::{BatchTranslator, GeminiClient};

pub struct MangaTranslationPipeline {
    ocr: OcrService,
    translator: BatchTranslator<GeminiClient>,
    renderer: PageRenderer,
}

impl MangaTranslationPipeline {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let client = GeminiClient::new(config.gemini.clone())
            .map_err(|e| ConfigError::HttpClientInit(e.to_string()))?;
        Ok(Self {
            ocr: OcrService::new(config.ocr.clone()),
            translator: BatchTranslator::new(client, &config.processing),
            renderer: PageRenderer::new(&config.rendering),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&Config::new()?)
    }

    /// Run one end-to-end job and return the bundled PDF path.
    pub async fn run(&self, job: &TranslationJob) -> PipelineResult<PathBuf> {
        std::fs::create_dir_all(&job.outputs_dir).map_err(|source| PipelineError::Io {
            path: job.outputs_dir.clone(),
            source,
        })?;

        let extractions = self.ocr.extract(&job.input_path, &job.work_dir()).await?;
        info!(
            "Extracted {} pages, {} regions total",
            extractions.len(),
            extractions.iter().map(|e| e.regions.len()).sum::<usize>()
        );

        let pages_dir = job.pages_dir();
        let mut rendered_pages: Vec<RenderedPage> = Vec::with_capacity(extractions.len());
        for extraction in &extractions {
            let translation: PageTranslation = self
                .translator
                .translate_page(extraction, &job.target_language)
                .await;
            rendered_pages.push(self.renderer.render_page(&translation, &pages_dir).await?);
        }

        let bundle = bundle_pdf(&rendered_pages, &job.bundle_path())?;
        info!("Job complete: {}", bundle.display());
        Ok(bundle)
    }
}
