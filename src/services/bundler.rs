// PDF bundling: concatenates rendered raster pages into one document
//
// Each rendered page becomes a PDF page holding a single JPEG image XObject.
// MediaBox uses pixel dimensions (1 px = 1 pt), matching how the rendered
// rasters were produced.

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::errors::{BundleError, BundleResult};
use crate::core::types::RenderedPage;

const JPEG_QUALITY: u8 = 90;

/// Write all rendered pages, in input order, into a single PDF.
pub fn bundle_pdf(rendered_pages: &[RenderedPage], output_pdf: &Path) -> BundleResult<PathBuf> {
    if rendered_pages.is_empty() {
        return Err(BundleError::EmptyDocument);
    }

    if let Some(parent) = output_pdf.parent() {
        std::fs::create_dir_all(parent).map_err(|source| BundleError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(rendered_pages.len());
    for page in rendered_pages {
        let page_id = add_image_page(&mut doc, pages_id, &page.output_path)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(output_pdf).map_err(|source| BundleError::WriteFailed {
        path: output_pdf.to_path_buf(),
        source: lopdf::Error::IO(source),
    })?;

    info!("Bundled {} pages into {}", rendered_pages.len(), output_pdf.display());
    Ok(output_pdf.to_path_buf())
}

/// Embed one raster as a full-bleed image page, returning the page object id.
fn add_image_page(
    doc: &mut Document,
    pages_id: lopdf::ObjectId,
    image_path: &Path,
) -> BundleResult<lopdf::ObjectId> {
    let image = image::open(image_path).map_err(|source| BundleError::PageEncodeFailed {
        path: image_path.to_path_buf(),
        source,
    })?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|source| BundleError::PageEncodeFailed {
            path: image_path.to_path_buf(),
            source,
        })?;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg_bytes,
    ));

    // Scale the unit image square up to the full page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content.encode().map_err(|source| BundleError::WriteFailed {
        path: image_path.to_path_buf(),
        source,
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

    let resources = dictionary! {
        "XObject" => dictionary! {
            "Im0" => Object::Reference(image_id),
        },
    };

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width as i64),
            Object::Integer(height as i64),
        ],
        "Resources" => resources,
        "Contents" => Object::Reference(content_id),
    });

    Ok(page_id)
}
