//! Document boundary detection: edges → contours → best rectangular quad.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use super::geometry::{order_corners, polygon_area, rectangularity};

/// Canny thresholds tuned for paper documents on cluttered backgrounds.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 120.0;

/// Polygon simplification tolerance as a fraction of the contour perimeter.
const DP_EPSILON_RATIO: f64 = 0.02;

/// Candidate quads must cover at least this fraction of the frame.
const MIN_AREA_RATIO: f32 = 0.20;

/// Accepted document aspect ratios (w/h after corner ordering).
const MIN_ASPECT: f32 = 0.3;
const MAX_ASPECT: f32 = 3.5;

/// Minimum combined score before a quad is trusted for warping.
const MIN_QUAD_SCORE: f32 = 0.55;

/// Find the contour best resembling a rectangular document.
/// Returns ordered corners (top-left first, clockwise), or `None` when
/// nothing in the frame looks like a page.
pub fn find_document_quad(gray: &GrayImage) -> Option<[(f32, f32); 4]> {
    let (width, height) = gray.dimensions();
    if width < 40 || height < 40 {
        return None;
    }
    let frame_area = (width * height) as f32;

    let blurred = gaussian_blur_f32(gray, 1.4);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
    let contours = find_contours::<i32>(&edges);

    let mut best: Option<([(f32, f32); 4], f32)> = None;
    for contour in &contours {
        if contour.points.len() < 4 {
            continue;
        }
        let Some(quad) = approximate_to_quad(&contour.points) else {
            continue;
        };

        let ordered = order_corners(quad);
        let area = polygon_area(&ordered);
        let area_ratio = area / frame_area;
        if area_ratio < MIN_AREA_RATIO {
            continue;
        }

        let [tl, tr, br, bl] = ordered;
        let w = (tr.0 - tl.0).abs().max((br.0 - bl.0).abs()).max(1.0);
        let h = (bl.1 - tl.1).abs().max((br.1 - tr.1).abs()).max(1.0);
        let aspect = w / h;
        if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
            continue;
        }

        let score = rectangularity(ordered) * 0.7 + area_ratio.min(1.0) * 0.3;
        if score < MIN_QUAD_SCORE {
            continue;
        }
        match &best {
            Some((_, best_score)) if *best_score >= score => {}
            _ => best = Some((ordered, score)),
        }
    }

    best.map(|(quad, score)| {
        tracing::debug!(score, "Document quad selected");
        quad
    })
}

/// Simplify a contour with Douglas-Peucker; accept only clean quads.
fn approximate_to_quad(points: &[Point<i32>]) -> Option<[(f32, f32); 4]> {
    let perimeter = arc_length(points, true);
    if perimeter <= 0.0 {
        return None;
    }
    let simplified = approximate_polygon_dp(points, DP_EPSILON_RATIO * perimeter, true);
    if simplified.len() != 4 {
        return None;
    }
    let mut quad = [(0.0f32, 0.0f32); 4];
    for (slot, p) in quad.iter_mut().zip(simplified.iter()) {
        *slot = (p.x as f32, p.y as f32);
    }
    Some(quad)
}
