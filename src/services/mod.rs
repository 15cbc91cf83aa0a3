// Service layer: one module per pipeline stage

pub mod bundler;
pub mod ocr;
pub mod rendering;
pub mod translation;

pub use bundler::bundle_pdf;
pub use ocr::OcrService;
pub use rendering::PageRenderer;
pub use translation::{BatchTranslator, GeminiClient, TranslationClient};
