// CLI entry point for the manga translation pipeline

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use manga_translator::{Config, MangaTranslationPipeline, TranslationJob};

/// Translate manga pages (PNG/JPG/PDF) while preserving the artwork
#[derive(Debug, Parser)]
#[command(name = "manga-translator", version)]
struct Cli {
    /// Path to a PNG/JPG page or a multi-page PDF
    input: PathBuf,

    /// Target language code (default: from TARGET_LANGUAGE, falls back to "he")
    #[arg(short, long)]
    language: Option<String>,

    /// Destination directory for translated artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new()?;

    let filter = EnvFilter::new(format!(
        "manga_translator={}",
        config.log_level().to_string().to_lowercase()
    ));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let output_dir = cli.output_dir.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("run-%Y%m%d-%H%M%S");
        config.output.out_dir.join(stamp.to_string())
    });
    let target_language = cli
        .language
        .unwrap_or_else(|| config.processing.target_language.clone());

    info!(
        "Translating {} to '{}' into {}",
        cli.input.display(),
        target_language,
        output_dir.display()
    );

    let pipeline = MangaTranslationPipeline::new(&config)?;
    let job = TranslationJob::new(cli.input, output_dir, target_language);
    let pdf_path = pipeline.run(&job).await?;

    println!("Translated PDF written to {}", pdf_path.display());
    Ok(())
}
