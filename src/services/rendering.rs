// Page rendering: draws translated text back onto the original artwork
//
// Each region gets an opaque backing box over its (padded, clamped) bbox and
// its translated text shaped by cosmic-text: word wrap to the box width,
// advanced shaping for bidirectional scripts, right-aligned lines.

use cosmic_text::{
    Align, Attrs, Buffer, Color as CosmicColor, FontSystem, Metrics, Shaping, SwashCache, Wrap,
};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::config::RenderingConfig;
use crate::core::errors::{RenderError, RenderResult};
use crate::core::types::{pad_bbox, PageTranslation, RegionTranslation, RenderedPage};

const BACKING_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Minimum usable text width inside a backing box, in pixels.
const MIN_TEXT_WIDTH: f32 = 10.0;

pub struct PageRenderer {
    font_system: Mutex<FontSystem>,
    swash_cache: Mutex<SwashCache>,
    font_size: f32,
    padding: i32,
}

impl PageRenderer {
    pub fn new(config: &RenderingConfig) -> Self {
        let font_system = create_font_system(config.font_path.as_deref());
        Self {
            font_system: Mutex::new(font_system),
            swash_cache: Mutex::new(SwashCache::new()),
            font_size: config.font_size as f32,
            padding: config.bubble_padding as i32,
        }
    }

    /// Render one page: backing boxes plus translated text, saved as
    /// `page-{index:03}.png` under `out_dir`.
    pub async fn render_page(
        &self,
        translation: &PageTranslation,
        out_dir: &Path,
    ) -> RenderResult<RenderedPage> {
        std::fs::create_dir_all(out_dir).map_err(|source| RenderError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut image = image::open(&translation.image_path)?.to_rgba8();
        for region in &translation.regions {
            self.draw_region(&mut image, region).await;
        }

        let output_path = out_dir.join(format!("page-{:03}.png", translation.page_index));
        image.save(&output_path)?;
        debug!(
            "Rendered page {} ({} regions) to {}",
            translation.page_index,
            translation.regions.len(),
            output_path.display()
        );
        Ok(RenderedPage {
            page_index: translation.page_index,
            output_path,
        })
    }

    async fn draw_region(&self, image: &mut RgbaImage, region: &RegionTranslation) {
        let (width, height) = (image.width(), image.height());
        let [x0, y0, x1, y1] = pad_bbox(&region.bbox, self.padding, width, height);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        fill_rect(image, x0, y0, x1, y1, BACKING_COLOR);

        let text = region.translated_text.replace('\n', " ");
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let max_width = ((x1 - x0 - self.padding * 2) as f32).max(MIN_TEXT_WIDTH);
        let origin_x = x0 + self.padding;
        let origin_y = y0 + self.padding;

        // Shape in one lock scope, then draw
        let buffer = {
            let mut font_system = self.font_system.lock().await;
            let metrics = Metrics::new(self.font_size, self.font_size * 1.4);
            let mut buffer = Buffer::new(&mut font_system, metrics);
            buffer.set_size(&mut font_system, Some(max_width), None);
            buffer.set_wrap(&mut font_system, Wrap::Word);

            let attrs = Attrs::new();
            buffer.set_text(&mut font_system, text, &attrs, Shaping::Advanced);
            // Right-anchored lines; shaping handles RTL display reordering
            for line in buffer.lines.iter_mut() {
                line.set_align(Some(Align::Right));
            }
            buffer.shape_until_scroll(&mut font_system, false);
            buffer
        };

        let mut font_system = self.font_system.lock().await;
        let mut swash_cache = self.swash_cache.lock().await;
        buffer.draw(
            &mut font_system,
            &mut swash_cache,
            CosmicColor::rgba(0, 0, 0, 255),
            |px_x, px_y, _w, _h, pixel_color| {
                let img_x = origin_x + px_x;
                let img_y = origin_y + px_y;
                if img_x < 0 || img_x >= width as i32 || img_y < 0 || img_y >= height as i32 {
                    return;
                }

                let existing = *image.get_pixel(img_x as u32, img_y as u32);
                let alpha = pixel_color.a() as f32 / 255.0;
                let inv_alpha = 1.0 - alpha;
                let blended = Rgba([
                    ((pixel_color.r() as f32 * alpha) + (existing[0] as f32 * inv_alpha)) as u8,
                    ((pixel_color.g() as f32 * alpha) + (existing[1] as f32 * inv_alpha)) as u8,
                    ((pixel_color.b() as f32 * alpha) + (existing[2] as f32 * inv_alpha)) as u8,
                    existing[3].max(pixel_color.a()),
                ]);
                image.put_pixel(img_x as u32, img_y as u32, blended);
            },
        );
    }
}

/// Build the font database: the configured font file when readable, the
/// system font set otherwise. A bad font never aborts rendering.
fn create_font_system(font_path: Option<&Path>) -> FontSystem {
    use cosmic_text::fontdb;

    if let Some(path) = font_path {
        match std::fs::read(path) {
            Ok(data) => {
                let mut db = fontdb::Database::new();
                db.load_font_data(data);
                if db.len() > 0 {
                    info!("Loaded font from {}", path.display());
                    return FontSystem::new_with_locale_and_db("en-US".to_string(), db);
                }
                warn!(
                    "Font file {} contains no usable faces, falling back to system fonts",
                    path.display()
                );
            }
            Err(err) => {
                warn!(
                    "Failed to read font file {} ({}), falling back to system fonts",
                    path.display(),
                    err
                );
            }
        }
    }
    FontSystem::new()
}

fn fill_rect(image: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    for y in y0.max(0)..y1.min(image.height() as i32) {
        for x in x0.max(0)..x1.min(image.width() as i32) {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PageTranslation;

    fn renderer() -> PageRenderer {
        PageRenderer::new(&RenderingConfig {
            font_path: None,
            font_size: 28,
            bubble_padding: 6,
        })
    }

    fn region(bbox: [i32; 4], translated: &str) -> RegionTranslation {
        RegionTranslation {
            bbox,
            source_text: "src".into(),
            translated_text: translated.into(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        fill_rect(&mut img, -5, -5, 5, 5, Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(4, 4)[0], 255);
        assert_eq!(img.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn test_missing_font_file_degrades() {
        // Unreadable font path must not panic; FontSystem falls back
        let _ = create_font_system(Some(Path::new("/nonexistent/font.ttf")));
    }

    #[tokio::test]
    async fn test_render_page_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("page.png");
        RgbaImage::from_pixel(120, 120, Rgba([200, 200, 200, 255]))
            .save(&source)
            .unwrap();

        let translation = PageTranslation {
            page_index: 3,
            image_path: source,
            regions: vec![region([10, 10, 90, 50], "שלום")],
        };

        let rendered = renderer()
            .render_page(&translation, tmp.path())
            .await
            .unwrap();

        assert_eq!(rendered.page_index, 3);
        assert!(rendered.output_path.ends_with("page-003.png"));
        let out = image::open(&rendered.output_path).unwrap().to_rgba8();
        // Backing box painted white at the padded bbox
        assert_eq!(out.get_pixel(50, 30)[0], 255);
    }

    #[tokio::test]
    async fn test_render_missing_image_fails_with_error() {
        let tmp = tempfile::tempdir().unwrap();
        let translation = PageTranslation {
            page_index: 0,
            image_path: tmp.path().join("missing.png"),
            regions: vec![],
        };
        assert!(renderer().render_page(&translation, tmp.path()).await.is_err());
    }
}
