use crate::core::errors::ConfigError;
use std::env;
use std::path::PathBuf;
use tracing::Level;

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

/// OCR configuration
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Primary OCR language code, or "auto" to try `auto_languages` in order.
    pub language_hint: String,
    /// Priority-ordered fallback hints used when `language_hint` is "auto".
    pub auto_languages: Vec<String>,
    pub dpi: u32,
    pub tesseract_cmd: String,
    pub pdftoppm_cmd: String,
}

impl OcrConfig {
    /// Language hints to try, in priority order.
    pub fn language_hints(&self) -> Vec<String> {
        if self.language_hint.eq_ignore_ascii_case("auto") {
            self.auto_languages.clone()
        } else {
            vec![self.language_hint.clone()]
        }
    }
}

/// Batch translation configuration
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub target_language: String,
    pub batch_size: usize,
    pub max_chars_per_batch: usize,
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderingConfig {
    pub font_path: Option<PathBuf>,
    pub font_size: u32,
    pub bubble_padding: u32,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
}

/// Upload server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: Level,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub ocr: OcrConfig,
    pub processing: ProcessingConfig,
    pub rendering: RenderingConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let auto_languages = env::var("OCR_AUTO_LANGS")
            .unwrap_or_else(|_| "eng+jpn,eng".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            gemini: GeminiConfig {
                api_key,
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
                temperature: parse_env("GEMINI_TEMPERATURE", 0.4)?,
                max_output_tokens: parse_env("GEMINI_MAX_OUTPUT_TOKENS", 2048)?,
                timeout_seconds: parse_env("API_TIMEOUT_SECONDS", 60)?,
            },
            ocr: OcrConfig {
                language_hint: env::var("OCR_LANG").unwrap_or_else(|_| "eng".to_string()),
                auto_languages,
                dpi: parse_env("OCR_DPI", 300)?,
                tesseract_cmd: env::var("TESSERACT_CMD")
                    .unwrap_or_else(|_| "tesseract".to_string()),
                pdftoppm_cmd: env::var("PDFTOPPM_CMD")
                    .unwrap_or_else(|_| "pdftoppm".to_string()),
            },
            processing: ProcessingConfig {
                target_language: env::var("TARGET_LANGUAGE").unwrap_or_else(|_| "he".to_string()),
                batch_size: parse_env("TRANSLATION_BATCH_SIZE", 16)?,
                max_chars_per_batch: parse_env("TRANSLATION_MAX_CHARS", 1500)?,
            },
            rendering: RenderingConfig {
                font_path: env::var("FONT_PATH").ok().map(PathBuf::from),
                font_size: parse_env("FONT_SIZE", 28)?,
                bubble_padding: parse_env("BUBBLE_PADDING", 6)?,
            },
            output: OutputConfig {
                out_dir: PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| "outputs".to_string())),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env("SERVER_PORT", 1420)?,
                log_level,
            },
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(72..=600).contains(&self.ocr.dpi) {
            return Err(ConfigError::InvalidDpi(self.ocr.dpi));
        }
        if !(1..=64).contains(&self.processing.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.processing.batch_size));
        }
        if !(200..=6000).contains(&self.processing.max_chars_per_batch) {
            return Err(ConfigError::InvalidMaxChars(
                self.processing.max_chars_per_batch,
            ));
        }
        if !(10..=72).contains(&self.rendering.font_size) {
            return Err(ConfigError::InvalidFontSize(self.rendering.font_size));
        }
        if self.rendering.bubble_padding > 40 {
            return Err(ConfigError::InvalidBubblePadding(
                self.rendering.bubble_padding,
            ));
        }
        Ok(())
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::EnvVarError(format!(
                "{name}={raw} (expected {})",
                std::any::type_name::<T>()
            ))
        }),
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors
