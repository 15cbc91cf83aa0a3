// Library exports for the manga translation pipeline

pub mod core;
pub mod pipeline;
pub mod services;

pub use crate::core::{
    config::Config,
    errors::{BundleError, ConfigError, OcrError, PipelineError, RenderError, TranslationError},
    types::{
        PageExtraction, PageTranslation, RegionTranslation, RenderedPage, TextRegion,
        TranslationJob,
    },
};

pub use pipeline::MangaTranslationPipeline;

pub use services::{BatchTranslator, GeminiClient, OcrService, PageRenderer, TranslationClient};
