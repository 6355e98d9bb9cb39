//! Read-only quality assessment of the normalized capture.
//!
//! Warnings never block the pipeline — the operator captured this file on
//! purpose, so it is processed regardless and the findings are logged for
//! triage.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Laplacian variance below this reads as blurry for document photos.
const BLUR_THRESHOLD: f32 = 100.0;

/// RMS contrast below this: near-uniform image.
const CONTRAST_THRESHOLD: f32 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QualityWarning {
    MostlyBlank,
    MostlyDark,
    Blurry { score: f32 },
    LowContrast { score: f32 },
}

/// Assess blank/dark ratios, sharpness and contrast.
pub fn assess_quality(image: &RgbImage) -> Vec<QualityWarning> {
    let mut warnings = Vec::new();
    let pixel_count = (image.width() as usize) * (image.height() as usize);
    if pixel_count == 0 {
        return warnings;
    }

    let white_pixels = image
        .pixels()
        .filter(|p| p.0[0] > 240 && p.0[1] > 240 && p.0[2] > 240)
        .count();
    let is_blank = white_pixels as f32 / pixel_count as f32 > 0.95;
    if is_blank {
        warnings.push(QualityWarning::MostlyBlank);
    }

    let dark_pixels = image
        .pixels()
        .filter(|p| p.0[0] < 15 && p.0[1] < 15 && p.0[2] < 15)
        .count();
    let is_dark = dark_pixels as f32 / pixel_count as f32 > 0.80;
    if is_dark {
        warnings.push(QualityWarning::MostlyDark);
    }

    let gray = image::DynamicImage::ImageRgb8(image.clone()).to_luma8();

    let blur_score = laplacian_variance(&gray);
    if blur_score < BLUR_THRESHOLD && !is_blank && !is_dark {
        warnings.push(QualityWarning::Blurry { score: blur_score });
    }

    let contrast_score = rms_contrast(&gray);
    if contrast_score < CONTRAST_THRESHOLD && !is_blank && !is_dark {
        warnings.push(QualityWarning::LowContrast {
            score: contrast_score,
        });
    }

    warnings
}

/// Laplacian variance — the standard sharpness metric. Blurry documents
/// score below 100, sharp text above 500. 3x3 kernel `[0,1,0; 1,-4,1; 0,1,0]`.
pub fn laplacian_variance(img: &GrayImage) -> f32 {
    let (w, h) = (img.width() as i32, img.height() as i32);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = img.get_pixel(x as u32, y as u32).0[0] as f64;
            let top = img.get_pixel(x as u32, (y - 1) as u32).0[0] as f64;
            let bottom = img.get_pixel(x as u32, (y + 1) as u32).0[0] as f64;
            let left = img.get_pixel((x - 1) as u32, y as u32).0[0] as f64;
            let right = img.get_pixel((x + 1) as u32, y as u32).0[0] as f64;

            let laplacian = top + bottom + left + right - 4.0 * center;
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    ((sum_sq / count as f64) - mean * mean).max(0.0) as f32
}

/// RMS contrast: standard deviation of grayscale intensities.
pub fn rms_contrast(img: &GrayImage) -> f32 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for pixel in img.pixels() {
        let val = pixel.0[0] as f64;
        sum += val;
        sum_sq += val * val;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    ((sum_sq / count as f64) - mean * mean).max(0.0).sqrt() as f32
}
