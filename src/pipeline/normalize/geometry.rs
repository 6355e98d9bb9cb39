//! Pure geometry helpers for document boundary detection.
//!
//! Everything operates on `(f32, f32)` points so it stays independent of the
//! image crates and trivially unit-testable.

/// Euclidean distance between two points.
pub fn point_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Interior angle at `vertex` formed by `prev` and `next`, in degrees.
pub fn angle_at(prev: (f32, f32), vertex: (f32, f32), next: (f32, f32)) -> f32 {
    let v1 = (prev.0 - vertex.0, prev.1 - vertex.1);
    let v2 = (next.0 - vertex.0, next.1 - vertex.1);
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag = (v1.0 * v1.0 + v1.1 * v1.1).sqrt() * (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag == 0.0 {
        return 0.0;
    }
    (dot / mag).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Polygon area via the shoelace formula. Vertex order does not matter for
/// the magnitude.
pub fn polygon_area(points: &[(f32, f32)]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        sum += x1 * y2 - x2 * y1;
    }
    (sum / 2.0).abs()
}

/// Order four quad corners as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest x+y sum, bottom-right the largest; the remaining
/// two are separated by the sign of x−y.
pub fn order_corners(corners: [(f32, f32); 4]) -> [(f32, f32); 4] {
    let mut by_sum = corners;
    by_sum.sort_by(|a, b| {
        (a.0 + a.1)
            .partial_cmp(&(b.0 + b.1))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top_left = by_sum[0];
    let bottom_right = by_sum[3];

    let mut rest: Vec<(f32, f32)> = corners
        .iter()
        .filter(|&&p| p != top_left && p != bottom_right)
        .copied()
        .collect();
    rest.sort_by(|a, b| {
        (b.0 - b.1)
            .partial_cmp(&(a.0 - a.1))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let top_right = rest.first().copied().unwrap_or(top_left);
    let bottom_left = rest.get(1).copied().unwrap_or(bottom_right);

    [top_left, top_right, bottom_right, bottom_left]
}

/// Output dimensions of the canonical rectangle for an ordered quad: the
/// longer of each opposing edge pair, so no document edge is squeezed.
pub fn target_dimensions(quad: [(f32, f32); 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = quad;
    let width = point_distance(tl, tr).max(point_distance(bl, br));
    let height = point_distance(tl, bl).max(point_distance(tr, br));
    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// How rectangular a quad is, 0..1. Combines corner angles (near 90°) with
/// the fill ratio against its own bounding box.
pub fn rectangularity(quad: [(f32, f32); 4]) -> f32 {
    let [tl, tr, br, bl] = quad;
    let corners = [
        angle_at(bl, tl, tr),
        angle_at(tl, tr, br),
        angle_at(tr, br, bl),
        angle_at(br, bl, tl),
    ];
    let angle_score: f32 = corners
        .iter()
        .map(|a| 1.0 - ((a - 90.0).abs() / 90.0).min(1.0))
        .sum::<f32>()
        / 4.0;

    let xs = [tl.0, tr.0, br.0, bl.0];
    let ys = [tl.1, tr.1, br.1, bl.1];
    let bbox_w = xs.iter().cloned().fold(f32::MIN, f32::max)
        - xs.iter().cloned().fold(f32::MAX, f32::min);
    let bbox_h = ys.iter().cloned().fold(f32::MIN, f32::max)
        - ys.iter().cloned().fold(f32::MAX, f32::min);
    let bbox_area = bbox_w * bbox_h;
    let fill = if bbox_area > 0.0 {
        (polygon_area(&[tl, tr, br, bl]) / bbox_area).min(1.0)
    } else {
        0.0
    };

    angle_score * 0.6 + fill * 0.4
}
