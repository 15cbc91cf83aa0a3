// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Context preservation
// - Type-safe error matching
// - Source error chaining

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is required (set it in the environment or .env)")]
    MissingApiKey,

    #[error("OCR DPI must be in [72, 600], got {0}")]
    InvalidDpi(u32),

    #[error("Translation batch size must be in [1, 64], got {0}")]
    InvalidBatchSize(usize),

    #[error("Max characters per batch must be in [200, 6000], got {0}")]
    InvalidMaxChars(usize),

    #[error("Font size must be in [10, 72], got {0}")]
    InvalidFontSize(u32),

    #[error("Bubble padding must be in [0, 40], got {0}")]
    InvalidBubblePadding(u32),

    #[error("Environment variable parsing failed: {0}")]
    EnvVarError(String),

    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(String),
}

/// Region extraction errors
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Unsupported input format: {0} (expected PNG, JPG, or PDF)")]
    UnsupportedInput(PathBuf),

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF rasterization failed for {path}: {stderr}")]
    RasterizeFailed { path: PathBuf, stderr: String },

    #[error("PDF produced no raster pages: {0}")]
    NoPages(PathBuf),

    #[error("OCR engine failed with language hint '{hint}': {stderr}")]
    EngineFailed { hint: String, stderr: String },

    #[error("All OCR language hints {hints:?} failed on page {page_index}")]
    AllHintsFailed { page_index: usize, hints: Vec<String> },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Translation call/validation errors
///
/// These are always caught at the batch boundary and converted into the
/// identity fallback; they never abort a page.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Response is missing a JSON array")]
    MissingArray,

    #[error("Response array is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected a JSON array, got a different JSON value")]
    NotAnArray,

    #[error("Translation count mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Malformed response body: {0}")]
    MalformedResponse(String),
}

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bundling errors
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("No rendered pages to bundle")]
    EmptyDocument,

    #[error("Failed to encode page image {path}: {source}")]
    PageEncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("PDF write failed for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline orchestration errors (the fatal surface of a job)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type OcrResult<T> = Result<T, OcrError>;
pub type TranslationResult<T> = Result<T, TranslationError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type BundleResult<T> = Result<T, BundleError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
