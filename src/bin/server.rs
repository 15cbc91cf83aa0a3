// Upload/download HTTP surface for the manga translation pipeline
//
// POST /translate accepts a multipart form with a "file" field (PNG/JPG/PDF)
// and an optional "language" field, runs the pipeline in a temporary job
// directory, and responds with the bundled PDF.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use manga_translator::{Config, MangaTranslationPipeline, TranslationJob};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: Arc<MangaTranslationPipeline>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::new()?);

    let filter = EnvFilter::new(format!(
        "manga_translator={0},server={0}",
        config.log_level().to_string().to_lowercase()
    ));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pipeline = Arc::new(MangaTranslationPipeline::new(config.as_ref())?);
    let state = AppState {
        config: config.clone(),
        pipeline,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/translate", post(translate))
        .with_state(state)
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // page scans get large
        .layer(cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on http://{}", addr);
    info!("  GET  /          - Root endpoint");
    info!("  GET  /health    - Health check");
    info!("  POST /translate - Translate an uploaded page or PDF");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> &'static str {
    "Manga Translation Pipeline"
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn translate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.png").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;
                file = Some((filename, data.to_vec()));
            }
            "language" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {e}")))?;
                if !value.trim().is_empty() {
                    language = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        return Err((StatusCode::BAD_REQUEST, "No file provided".to_string()));
    };

    // Per-request job directory, removed when the guard drops
    let job_dir = tempfile::tempdir()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Temp dir error: {e}")))?;
    let input_path = job_dir.path().join(&filename);
    tokio::fs::write(&input_path, &data)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Write error: {e}")))?;

    let target_language =
        language.unwrap_or_else(|| state.config.processing.target_language.clone());
    let job = TranslationJob::new(input_path, job_dir.path().join("outputs"), target_language);

    info!("Translating upload '{}' to '{}'", filename, job.target_language);
    let pdf_path = state.pipeline.run(&job).await.map_err(|e| {
        error!("Translation job failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Translation failed: {e}"))
    })?;

    let pdf_bytes = tokio::fs::read(&pdf_path)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Read error: {e}")))?;

    info!("Upload '{}' translated ({} bytes)", filename, pdf_bytes.len());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"translated.pdf\"".to_string(),
            ),
        ],
        pdf_bytes,
    ))
}
