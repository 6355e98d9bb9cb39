pub mod contour;
pub mod geometry;
pub mod quality;

pub use contour::find_document_quad;
pub use geometry::*;
pub use quality::{assess_quality, QualityWarning};

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use thiserror::Error;

/// Maximum input size before rejecting. Prevents OOM on corrupt files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Smallest byte count any real raster format produces.
const MIN_IMAGE_BYTES: usize = 67;

/// Boundary detection runs on a capped copy for speed; the warp itself uses
/// the full-resolution pixels.
const DETECTION_MAX_DIM: u32 = 1280;

/// Smart-crop margin when no confident page contour exists.
const SMART_CROP_MARGIN: f32 = 0.02;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Image data too small to be valid")]
    TooSmall,

    #[error("Image data exceeds {0}MB limit")]
    TooLarge(usize),

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Which geometric correction was applied to the capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionKind {
    /// Four-point perspective warp onto the detected page quad.
    Perspective,
    /// No confident contour; fixed small-margin crop.
    SmartCrop,
    /// Unmodified passthrough.
    None,
}

/// The canonical image produced by the normalizer. Owned by the pipeline
/// run and dropped after PDF conversion.
pub struct NormalizedImage {
    pub image: RgbImage,
    /// Detected page quad in source coordinates, top-left first, clockwise.
    pub source_contour: Option<[(f32, f32); 4]>,
    /// Rotation applied from EXIF orientation, in degrees.
    pub rotation_degrees: f32,
    pub applied_correction: bool,
    pub correction: CorrectionKind,
    pub warnings: Vec<QualityWarning>,
}

/// Geometric normalizer: EXIF orientation → boundary detection →
/// perspective correction, degrading to smart crop and finally to a
/// passthrough. Only undecodable input is an error; a missed detection
/// never fails the run.
pub struct GeometricNormalizer {
    detection_max_dim: u32,
}

impl Default for GeometricNormalizer {
    fn default() -> Self {
        Self {
            detection_max_dim: DETECTION_MAX_DIM,
        }
    }
}

impl GeometricNormalizer {
    pub fn normalize(&self, raw_bytes: &[u8]) -> Result<NormalizedImage, NormalizeError> {
        validate_image_bytes(raw_bytes)?;

        let decoded = image::load_from_memory(raw_bytes)
            .map_err(|e| NormalizeError::Decode(e.to_string()))?;

        // Phone photos embed rotation in EXIF tag 0x0112; without this the
        // page arrives sideways.
        let orientation = read_exif_orientation(raw_bytes);
        let rotation_degrees = orientation_degrees(orientation);
        let oriented = apply_orientation(decoded, orientation).to_rgb8();

        let (quad, corrected) = self.correct_geometry(&oriented);
        let warnings = assess_quality(&corrected.0);
        for warning in &warnings {
            tracing::debug!(?warning, "Capture quality warning");
        }

        Ok(NormalizedImage {
            image: corrected.0,
            source_contour: quad,
            rotation_degrees,
            applied_correction: corrected.1 != CorrectionKind::None,
            correction: corrected.1,
            warnings,
        })
    }

    /// Detect the page quad on a downscaled copy, then warp the original.
    fn correct_geometry(
        &self,
        image: &RgbImage,
    ) -> (Option<[(f32, f32); 4]>, (RgbImage, CorrectionKind)) {
        let (width, height) = image.dimensions();
        let largest = width.max(height);
        let scale = if largest > self.detection_max_dim {
            self.detection_max_dim as f32 / largest as f32
        } else {
            1.0
        };

        let detection_image = if scale < 1.0 {
            image::imageops::resize(
                image,
                ((width as f32 * scale) as u32).max(1),
                ((height as f32 * scale) as u32).max(1),
                FilterType::Triangle,
            )
        } else {
            image.clone()
        };
        let gray = DynamicImage::ImageRgb8(detection_image).to_luma8();

        match find_document_quad(&gray) {
            Some(scaled_quad) => {
                let quad = scaled_quad.map(|(x, y)| (x / scale, y / scale));
                match warp_to_quad(image, quad) {
                    Some(warped) => {
                        tracing::debug!(
                            from = format!("{width}x{height}"),
                            to = format!("{}x{}", warped.width(), warped.height()),
                            "Perspective correction applied"
                        );
                        (Some(quad), (warped, CorrectionKind::Perspective))
                    }
                    None => {
                        tracing::warn!("Degenerate projection, falling back to smart crop");
                        (Some(quad), (smart_crop(image), CorrectionKind::SmartCrop))
                    }
                }
            }
            None => {
                tracing::debug!("No confident page contour, applying smart crop");
                (None, (smart_crop(image), CorrectionKind::SmartCrop))
            }
        }
    }
}

/// Four-point perspective correction onto the canonical rectangle.
fn warp_to_quad(image: &RgbImage, quad: [(f32, f32); 4]) -> Option<RgbImage> {
    let (target_w, target_h) = geometry::target_dimensions(quad);
    let target = [
        (0.0, 0.0),
        (target_w as f32, 0.0),
        (target_w as f32, target_h as f32),
        (0.0, target_h as f32),
    ];
    let projection = Projection::from_control_points(quad, target)?;

    let mut out = RgbImage::from_pixel(target_w, target_h, Rgb([255, 255, 255]));
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
        &mut out,
    );
    Some(out)
}

/// Fixed-margin crop for captures without a detectable page boundary.
fn smart_crop(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let margin_x = (width as f32 * SMART_CROP_MARGIN) as u32;
    let margin_y = (height as f32 * SMART_CROP_MARGIN) as u32;
    if width <= 2 * margin_x + 1 || height <= 2 * margin_y + 1 {
        return image.clone();
    }
    image::imageops::crop_imm(
        image,
        margin_x,
        margin_y,
        width - 2 * margin_x,
        height - 2 * margin_y,
    )
    .to_image()
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn orientation_degrees(orientation: u32) -> f32 {
    match orientation {
        3 | 4 => 180.0,
        5 | 6 => 90.0,
        7 | 8 => 270.0,
        _ => 0.0,
    }
}

fn validate_image_bytes(bytes: &[u8]) -> Result<(), NormalizeError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(NormalizeError::TooSmall);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(NormalizeError::TooLarge(MAX_IMAGE_BYTES / (1024 * 1024)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageOutputFormat;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn page_photo(width: u32, height: u32, inset: u32) -> Vec<u8> {
        let mut img = RgbImage::from_pixel(width, height, Rgb([25, 25, 25]));
        for y in inset..height - inset {
            for x in inset..width - inset {
                img.put_pixel(x, y, Rgb([235, 235, 235]));
            }
        }
        encode_png(&img)
    }

    #[test]
    fn rejects_too_small_input() {
        let normalizer = GeometricNormalizer::default();
        assert!(matches!(
            normalizer.normalize(&[0x89, 0x50]),
            Err(NormalizeError::TooSmall)
        ));
    }

    #[test]
    fn rejects_undecodable_input() {
        let normalizer = GeometricNormalizer::default();
        let garbage = [0xDEu8, 0xAD, 0xBE, 0xEF].repeat(32);
        assert!(matches!(
            normalizer.normalize(&garbage),
            Err(NormalizeError::Decode(_))
        ));
    }

    #[test]
    fn page_in_frame_gets_perspective_correction() {
        let normalizer = GeometricNormalizer::default();
        let bytes = page_photo(400, 300, 40);

        let result = normalizer.normalize(&bytes).unwrap();
        assert!(result.applied_correction);
        assert_eq!(result.correction, CorrectionKind::Perspective);
        assert!(result.source_contour.is_some());

        // Output should approximate the page region, not the full frame.
        assert!(result.image.width() < 360);
        assert!(result.image.width() > 280);
        assert!(result.image.height() < 260);
    }

    #[test]
    fn featureless_capture_falls_back_to_smart_crop() {
        let normalizer = GeometricNormalizer::default();
        let img = RgbImage::from_pixel(300, 200, Rgb([128, 128, 128]));
        let result = normalizer.normalize(&encode_png(&img)).unwrap();

        assert_eq!(result.correction, CorrectionKind::SmartCrop);
        assert!(result.source_contour.is_none());
        // 2% margins off each side
        assert_eq!(result.image.width(), 300 - 2 * 6);
        assert_eq!(result.image.height(), 200 - 2 * 4);
    }

    #[test]
    fn quality_warnings_attached_for_flat_capture() {
        let normalizer = GeometricNormalizer::default();
        let img = RgbImage::from_pixel(300, 200, Rgb([128, 128, 128]));
        let result = normalizer.normalize(&encode_png(&img)).unwrap();
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn smart_crop_keeps_tiny_images_intact() {
        let img = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let cropped = smart_crop(&img);
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn orientation_degrees_mapping() {
        assert_eq!(orientation_degrees(1), 0.0);
        assert_eq!(orientation_degrees(3), 180.0);
        assert_eq!(orientation_degrees(6), 90.0);
        assert_eq!(orientation_degrees(8), 270.0);
    }

    #[test]
    fn png_without_exif_is_not_rotated() {
        let img = RgbImage::from_pixel(80, 120, Rgb([200, 200, 200]));
        let bytes = encode_png(&img);
        assert_eq!(read_exif_orientation(&bytes), 1);
    }
}
