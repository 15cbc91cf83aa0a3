// Region extraction via the Tesseract CLI
//
// PDFs are rasterized page-by-page with pdftoppm before extraction. Each page
// is OCR'd with `tesseract <image> stdout --psm 6 tsv` and the TSV output is
// reduced to confident, non-empty text regions.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::config::OcrConfig;
use crate::core::errors::{OcrError, OcrResult};
use crate::core::types::{is_supported_input, PageExtraction, TextRegion};

/// Detections below this confidence (Tesseract's 0-100 scale) are discarded.
const MIN_CONFIDENCE: f32 = 30.0;

pub struct OcrService {
    config: OcrConfig,
}

impl OcrService {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Extract text regions from every page of the input.
    ///
    /// Returns one [`PageExtraction`] per page, `page_index` dense and 0-based
    /// in source page order.
    pub async fn extract(&self, input_path: &Path, work_dir: &Path) -> OcrResult<Vec<PageExtraction>> {
        if !input_path.exists() {
            return Err(OcrError::InputNotFound(input_path.to_path_buf()));
        }
        if !is_supported_input(input_path) {
            return Err(OcrError::UnsupportedInput(input_path.to_path_buf()));
        }

        tokio::fs::create_dir_all(work_dir).await.map_err(|source| OcrError::Io {
            path: work_dir.to_path_buf(),
            source,
        })?;

        let image_paths = self.prepare_images(input_path, work_dir).await?;

        let mut extractions = Vec::with_capacity(image_paths.len());
        for (page_index, image_path) in image_paths.into_iter().enumerate() {
            extractions.push(self.extract_single(&image_path, page_index).await?);
        }
        Ok(extractions)
    }

    /// Rasterize a PDF into per-page PNGs, or copy a single image into the
    /// work directory.
    async fn prepare_images(&self, input_path: &Path, work_dir: &Path) -> OcrResult<Vec<PathBuf>> {
        let is_pdf = input_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if !is_pdf {
            let file_name = input_path.file_name().unwrap_or_default();
            let target = work_dir.join(file_name);
            if target != input_path {
                tokio::fs::copy(input_path, &target).await.map_err(|source| OcrError::Io {
                    path: input_path.to_path_buf(),
                    source,
                })?;
            }
            return Ok(vec![target]);
        }

        info!("Rasterizing PDF at {} dpi via {}", self.config.dpi, self.config.pdftoppm_cmd);
        let prefix = work_dir.join("page");
        let output = Command::new(&self.config.pdftoppm_cmd)
            .arg("-png")
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(input_path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|source| OcrError::SpawnFailed {
                program: self.config.pdftoppm_cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::RasterizeFailed {
                path: input_path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pages = collect_rasterized_pages(work_dir)?;
        if pages.is_empty() {
            return Err(OcrError::NoPages(input_path.to_path_buf()));
        }
        debug!("Rasterized {} pages into {}", pages.len(), work_dir.display());
        Ok(pages)
    }

    /// OCR one page, trying each configured language hint in priority order.
    async fn extract_single(&self, image_path: &Path, page_index: usize) -> OcrResult<PageExtraction> {
        let hints = self.config.language_hints();
        for hint in &hints {
            match self.run_tesseract(image_path, hint).await {
                Ok(tsv) => {
                    let regions = parse_tesseract_tsv(&tsv);
                    info!("Page {}: captured {} text regions (lang {})", page_index, regions.len(), hint);
                    return Ok(PageExtraction {
                        page_index,
                        image_path: image_path.to_path_buf(),
                        regions,
                    });
                }
                Err(err) => {
                    warn!("OCR hint '{}' failed on page {}: {}", hint, page_index, err);
                }
            }
        }
        Err(OcrError::AllHintsFailed { page_index, hints })
    }

    async fn run_tesseract(&self, image_path: &Path, hint: &str) -> OcrResult<String> {
        let output = Command::new(&self.config.tesseract_cmd)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(hint)
            .arg("--psm")
            .arg("6")
            .arg("tsv")
            .output()
            .await
            .map_err(|source| OcrError::SpawnFailed {
                program: self.config.tesseract_cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                hint: hint.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Collect pdftoppm output files in page order.
///
/// pdftoppm zero-pads page numbers, so lexicographic filename order is page
/// order.
fn collect_rasterized_pages(work_dir: &Path) -> OcrResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(work_dir).map_err(|source| OcrError::Io {
        path: work_dir.to_path_buf(),
        source,
    })?;

    let mut pages: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()) == Some("png")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("page-"))
        })
        .collect();
    pages.sort();
    Ok(pages)
}

/// Parse Tesseract TSV output into accepted text regions.
///
/// TSV columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Rows with non-numeric confidence
/// (headers, structural rows), low confidence, or empty text are discarded
/// rather than reported as errors.
fn parse_tesseract_tsv(tsv: &str) -> Vec<TextRegion> {
    let mut regions = Vec::new();
    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() != 12 {
            continue;
        }
        let conf: f32 = match cols[10].parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        let text = cols[11].trim();
        if conf < MIN_CONFIDENCE || text.is_empty() {
            continue;
        }
        let coords: Option<Vec<i32>> = cols[6..10].iter().map(|c| c.parse().ok()).collect();
        let Some([x, y, w, h]) = coords.as_deref() else {
            continue;
        };
        regions.push(TextRegion {
            bbox: [*x, *y, *x + *w, *y + *h],
            text: text.to_string(),
            confidence: conf / 100.0,
        });
    }
    regions
}
