//! Iterative 4-point subdivision smoothing with corner preservation.
//!
//! Each pass walks the closed polyline and inserts one new vertex per
//! sufficiently long edge, displaced outward from the local midpoint
//! chord. Vertices whose turn exceeds the corner threshold are pinned:
//! they never move, and subdivision next to them anchors on the corner
//! itself instead of its neighbor, which keeps sharp features sharp
//! while everything else relaxes into a curve.

use kurbo::Point;

use crate::config::TraceConfig;
use crate::geom::{normalize, signed_angle, PointI32};

/// A smoothed closed path with its pinned-corner flags.
pub struct SmoothedPath {
    pub points: Vec<Point>,
    pub corners: Vec<bool>,
}

/// Flag every vertex whose unsigned turn reaches the threshold.
fn classify_corners(points: &[Point], threshold_rad: f64) -> Vec<bool> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            let turn = signed_angle(points[i] - prev, next - points[i]);
            turn.abs() >= threshold_rad
        })
        .collect()
}

/// Smooth a closed integer polyline into a float path.
pub fn smooth_path(path: &[PointI32], config: &TraceConfig) -> SmoothedPath {
    let mut points: Vec<Point> = path.iter().map(|p| p.to_point()).collect();
    let mut corners = classify_corners(&points, config.corner_threshold_rad());
    let length_threshold = config.length_threshold;

    for _ in 0..config.max_iterations {
        let n = points.len();
        if n < 3 {
            break;
        }

        let mut out_points = Vec::with_capacity(n * 2);
        let mut out_corners = Vec::with_capacity(n * 2);
        let mut can_terminate = true;

        for i in 0..n {
            let j = (i + 1) % n;
            out_points.push(points[i]);
            out_corners.push(corners[i]);

            let seg = (points[j] - points[i]).hypot();
            if seg <= length_threshold {
                continue;
            }

            // A much longer neighboring edge dominates the local shape;
            // subdividing against it would pull the curve sideways.
            let prev = (i + n - 1) % n;
            let next = (j + 1) % n;
            if (points[i] - points[prev]).hypot() >= 2.0 * seg
                || (points[next] - points[j]).hypot() >= 2.0 * seg
            {
                continue;
            }

            // Pinned corners anchor the inner chord on themselves.
            let p_idx = if corners[i] { i } else { prev };
            let n_idx = if corners[j] { j } else { next };
            if p_idx == i && n_idx == j {
                continue;
            }

            let mid_out = points[i].midpoint(points[j]);
            let mid_in = points[p_idx].midpoint(points[n_idx]);
            let vec = mid_out - mid_in;
            let inserted = if vec.hypot() < 1e-10 {
                mid_out
            } else {
                mid_out + normalize(vec) * (vec.hypot() / 8.0)
            };

            out_points.push(inserted);
            out_corners.push(false);

            if (inserted - points[i]).hypot() > length_threshold
                || (inserted - points[j]).hypot() > length_threshold
            {
                can_terminate = false;
            }
        }

        points = out_points;
        corners = out_corners;
        if can_terminate {
            break;
        }
    }

    SmoothedPath { points, corners }
}
