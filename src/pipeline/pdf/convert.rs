//! Rendering the normalized capture onto an A4 PDF page.

use std::io::BufWriter;

use chrono::NaiveDateTime;
use image::{DynamicImage, RgbImage};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};

use super::PdfError;
use crate::models::DocumentKind;

const PAGE_W_MM: f32 = 210.0;
const PAGE_H_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;

/// Placement resolution for the embedded capture. 150 dpi keeps stamps and
/// handwriting legible while the compressor controls actual pixel counts.
const RENDER_DPI: f32 = 150.0;

/// Metadata rendered into the emergency placeholder and used for the
/// document title.
#[derive(Debug, Clone)]
pub struct PdfMeta {
    pub title: String,
    pub patient_name: Option<String>,
    pub kind: DocumentKind,
    pub captured_at: NaiveDateTime,
}

/// Render the image centered on an A4 page, aspect ratio preserved within
/// the margins.
pub fn render_image_pdf(image: &RgbImage, meta: &PdfMeta) -> Result<Vec<u8>, PdfError> {
    let (doc, page1, layer1) = PdfDocument::new(&meta.title, Mm(PAGE_W_MM), Mm(PAGE_H_MM), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);

    let content_w = PAGE_W_MM - 2.0 * MARGIN_MM;
    let content_h = PAGE_H_MM - 2.0 * MARGIN_MM;

    // Native image size in mm at the render dpi, then fit into the content box.
    let native_w = image.width() as f32 * 25.4 / RENDER_DPI;
    let native_h = image.height() as f32 * 25.4 / RENDER_DPI;
    let scale = (content_w / native_w).min(content_h / native_h);
    let placed_w = native_w * scale;
    let placed_h = native_h * scale;
    let offset_x = MARGIN_MM + (content_w - placed_w) / 2.0;
    let offset_y = MARGIN_MM + (content_h - placed_h) / 2.0;

    let pdf_image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(image.clone()));
    pdf_image.add_to_layer(
        layer,
        ImageTransform {
            translate_x: Some(Mm(offset_x)),
            translate_y: Some(Mm(offset_y)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(RENDER_DPI),
            ..Default::default()
        },
    );

    save_document(doc)
}

/// Minimal metadata-only placeholder, emitted when conversion or
/// compression of the actual capture fails. The capture survives as a
/// record even when its pixels cannot be embedded.
pub fn render_emergency_pdf(meta: &PdfMeta) -> Result<Vec<u8>, PdfError> {
    let (doc, page1, layer1) = PdfDocument::new(&meta.title, Mm(PAGE_W_MM), Mm(PAGE_H_MM), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Render(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PdfError::Render(format!("PDF font error: {e}")))?;

    let mut y = Mm(270.0);
    layer.use_text("BELGE YER TUTUCU / DOCUMENT PLACEHOLDER", 13.0, Mm(20.0), y, &bold);
    y -= Mm(10.0);
    layer.use_text(
        "Original image could not be embedded; metadata preserved.",
        10.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(8.0);
    layer.use_text(
        format!("Document type: {}", meta.kind.as_str()),
        10.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(6.0);
    layer.use_text(
        format!(
            "Patient: {}",
            meta.patient_name.as_deref().unwrap_or("(unmatched)")
        ),
        10.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(6.0);
    layer.use_text(
        format!("Captured: {}", meta.captured_at.format("%Y-%m-%d %H:%M:%S")),
        10.0,
        Mm(20.0),
        y,
        &font,
    );

    save_document(doc)
}

fn save_document(doc: printpdf::PdfDocumentReference) -> Result<Vec<u8>, PdfError> {
    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| PdfError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| PdfError::Render(format!("PDF buffer error: {e}")))
}
