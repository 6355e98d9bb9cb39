//! Adaptive compression toward a byte budget.
//!
//! The loop re-encodes the capture as JPEG, degrading quality ×0.8 and
//! dimensions ×0.9 per round (5 rounds max) until the estimated output size
//! fits the budget. The estimate is the embedded JPEG payload plus a fixed
//! document overhead — the quantity the budget is defined against. When
//! rounds run out the last result is accepted even over budget; when
//! conversion itself fails a metadata-only placeholder is substituted so the
//! pipeline never crashes on an image-heavy payload.

use std::io::Cursor;

use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat, RgbImage};

use super::convert::{render_emergency_pdf, render_image_pdf, PdfMeta};
use super::PdfError;
use crate::models::CompressedDocument;

/// First-round JPEG quality.
const START_QUALITY: f32 = 0.9;
/// Per-round quality decay.
const QUALITY_DECAY: f32 = 0.8;
/// Per-round dimension decay.
const DIMENSION_DECAY: f32 = 0.9;
/// Fixed PDF structure overhead on top of the embedded payload.
const PDF_OVERHEAD_BYTES: usize = 2048;
/// Dimension floor — degrading below this makes documents unreadable.
const MIN_DIMENSION: u32 = 320;

pub struct AdaptiveCompressor {
    target_bytes: usize,
    max_rounds: u32,
}

impl AdaptiveCompressor {
    pub fn new(target_bytes: usize, max_rounds: u32) -> Self {
        Self {
            target_bytes,
            max_rounds,
        }
    }

    /// Convert and compress. Infallible by design: any error path ends in
    /// the emergency placeholder.
    pub fn convert_and_compress(
        &self,
        image: &RgbImage,
        original_size: usize,
        meta: &PdfMeta,
    ) -> CompressedDocument {
        match self.compress_inner(image, original_size, meta) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "PDF conversion failed, emitting emergency placeholder");
                self.emergency(original_size, meta)
            }
        }
    }

    fn compress_inner(
        &self,
        image: &RgbImage,
        original_size: usize,
        meta: &PdfMeta,
    ) -> Result<CompressedDocument, PdfError> {
        let outcome = compression_rounds(image, self.target_bytes, self.max_rounds)?;
        let estimated_size = outcome.jpeg_bytes.len() + PDF_OVERHEAD_BYTES;

        tracing::debug!(
            rounds = outcome.rounds_attempted,
            quality = outcome.quality,
            estimated = estimated_size,
            target = self.target_bytes,
            "Adaptive compression finished"
        );

        // Embed the re-encoded (artifact-carrying) pixels so the archived
        // page shows exactly what the size estimate was computed from.
        let degraded = image::load_from_memory(&outcome.jpeg_bytes)
            .map_err(|e| PdfError::Encode(e.to_string()))?
            .to_rgb8();
        let pdf_bytes = render_image_pdf(&degraded, meta)?;

        let ratio = if estimated_size > 0 {
            original_size as f32 / estimated_size as f32
        } else {
            1.0
        };

        Ok(CompressedDocument {
            pdf_base64: base64::engine::general_purpose::STANDARD.encode(&pdf_bytes),
            original_size,
            compressed_size: estimated_size,
            compression_ratio: ratio,
            quality_used: outcome.quality,
            emergency_compression: false,
        })
    }

    fn emergency(&self, original_size: usize, meta: &PdfMeta) -> CompressedDocument {
        // Placeholder generation uses text only; if even that fails the
        // payload is an empty document shell.
        let pdf_bytes = render_emergency_pdf(meta).unwrap_or_default();
        let size = pdf_bytes.len();
        CompressedDocument {
            pdf_base64: base64::engine::general_purpose::STANDARD.encode(&pdf_bytes),
            original_size,
            compressed_size: size,
            compression_ratio: if size > 0 {
                original_size as f32 / size as f32
            } else {
                1.0
            },
            quality_used: 0.0,
            emergency_compression: true,
        }
    }
}

pub(crate) struct CompressionOutcome {
    pub jpeg_bytes: Vec<u8>,
    pub quality: f32,
    pub rounds_attempted: u32,
}

/// The bounded degradation loop. Exposed for the compression invariant
/// tests: output fits the target, or all rounds were spent.
pub(crate) fn compression_rounds(
    image: &RgbImage,
    target_bytes: usize,
    max_rounds: u32,
) -> Result<CompressionOutcome, PdfError> {
    let payload_budget = target_bytes.saturating_sub(PDF_OVERHEAD_BYTES);

    let mut quality = START_QUALITY;
    let mut width = image.width();
    let mut height = image.height();
    let mut current = image.clone();
    let mut rounds = 0u32;

    loop {
        let jpeg_bytes = encode_jpeg(&current, quality)?;
        rounds += 1;

        if jpeg_bytes.len() <= payload_budget || rounds >= max_rounds {
            return Ok(CompressionOutcome {
                jpeg_bytes,
                quality,
                rounds_attempted: rounds,
            });
        }

        quality *= QUALITY_DECAY;
        width = ((width as f32 * DIMENSION_DECAY) as u32).max(MIN_DIMENSION);
        height = ((height as f32 * DIMENSION_DECAY) as u32).max(MIN_DIMENSION);
        current = image::imageops::resize(image, width, height, FilterType::Triangle);
    }
}

fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>, PdfError> {
    let q = (quality * 100.0).clamp(1.0, 100.0) as u8;
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(q))
        .map_err(|e| PdfError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}
