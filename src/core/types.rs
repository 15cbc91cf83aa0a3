// Data model shared across the pipeline stages
//
// Every stage consumes immutable values from the previous one and returns new
// values; nothing here is mutated after construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bounding box in pixel coordinates: (x0, y0, x1, y1) with x1 >= x0, y1 >= y0.
pub type BBox = [i32; 4];

/// A single text area detected by OCR on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    pub bbox: BBox,
    pub text: String,
    /// OCR confidence in [0.0, 1.0].
    pub confidence: f32,
}

/// All regions detected on one page, in the extractor's scan order.
///
/// Region order MUST be preserved through translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_index: usize,
    pub image_path: PathBuf,
    pub regions: Vec<TextRegion>,
}

impl PageExtraction {
    pub fn total_characters(&self) -> usize {
        self.regions.iter().map(|r| r.text.chars().count()).sum()
    }
}

/// Translation result for a single region.
///
/// bbox and confidence are carried through from the originating [`TextRegion`]
/// unmodified; only `translated_text` is model-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTranslation {
    pub bbox: BBox,
    pub source_text: String,
    pub translated_text: String,
    pub confidence: f32,
}

/// One page's translations, same length and order as its [`PageExtraction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTranslation {
    pub page_index: usize,
    pub image_path: PathBuf,
    pub regions: Vec<RegionTranslation>,
}

/// One rendered raster page on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    pub page_index: usize,
    pub output_path: PathBuf,
}

/// Describes one end-to-end translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    pub input_path: PathBuf,
    pub outputs_dir: PathBuf,
    pub target_language: String,
}

impl TranslationJob {
    pub fn new(
        input_path: impl Into<PathBuf>,
        outputs_dir: impl Into<PathBuf>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            outputs_dir: outputs_dir.into(),
            target_language: target_language.into(),
        }
    }

    /// Whether the input needs page-by-page rasterization before OCR.
    pub fn is_pdf(&self) -> bool {
        matches!(
            self.input_path.extension().and_then(|e| e.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("pdf")
        )
    }

    /// Directory holding intermediate per-page rasters.
    pub fn work_dir(&self) -> PathBuf {
        self.outputs_dir.join("work")
    }

    /// Directory holding rendered output pages.
    pub fn pages_dir(&self) -> PathBuf {
        self.outputs_dir.join("pages")
    }

    /// Final bundled document path under the job's output directory.
    pub fn bundle_path(&self) -> PathBuf {
        self.outputs_dir.join("translated.pdf")
    }
}

/// Expand a bbox by `padding` on every side, clamped to the canvas.
pub fn pad_bbox(bbox: &BBox, padding: i32, canvas_width: u32, canvas_height: u32) -> BBox {
    let [x0, y0, x1, y1] = *bbox;
    [
        (x0 - padding).max(0),
        (y0 - padding).max(0),
        (x1 + padding).min(canvas_width as i32),
        (y1 + padding).min(canvas_height as i32),
    ]
}

pub fn is_supported_input(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "pdf")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_is_pdf() {
        let job = TranslationJob::new("chapter.PDF", "out", "he");
        assert!(job.is_pdf());

        let job = TranslationJob::new("page.png", "out", "he");
        assert!(!job.is_pdf());
    }

    #[test]
    fn test_pad_bbox_clamps_to_canvas() {
        let bbox = [2, 3, 98, 97];
        assert_eq!(pad_bbox(&bbox, 6, 100, 100), [0, 0, 100, 100]);
        assert_eq!(pad_bbox(&bbox, 0, 100, 100), bbox);
    }

    #[test]
    fn test_total_characters() {
        let extraction = PageExtraction {
            page_index: 0,
            image_path: "p.png".into(),
            regions: vec![
                TextRegion { bbox: [0, 0, 1, 1], text: "Hi".into(), confidence: 0.9 },
                TextRegion { bbox: [0, 2, 1, 3], text: "Bye".into(), confidence: 0.8 },
            ],
        };
        assert_eq!(extraction.total_characters(), 5);
    }

    #[test]
    fn test_supported_inputs() {
        assert!(is_supported_input(Path::new("a.jpeg")));
        assert!(is_supported_input(Path::new("a.pdf")));
        assert!(!is_supported_input(Path::new("a.gif")));
        assert!(!is_supported_input(Path::new("noext")));
    }
}
