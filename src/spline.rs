//! Cubic Bezier fitting over smoothed boundary paths.
//!
//! The closed path is cut at splice points (curvature inflections and
//! accumulated-turn limits), and a single least-squares cubic is fitted
//! between consecutive cuts. Because the cuts form a cycle, the fitted
//! segments always close up into one spline.

use kurbo::Point;

use crate::geom::{intersect_lines, signed_angle, LineCross};
use crate::smooth::SmoothedPath;

/// A closed piecewise-cubic path: one start point followed by three
/// points (two handles and an endpoint) per segment. The final endpoint
/// coincides with the start.
#[derive(Debug, Clone, Default)]
pub struct Spline {
    pub points: Vec<Point>,
}

impl Spline {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of cubic segments.
    pub fn segments(&self) -> usize {
        if self.points.len() < 4 {
            0
        } else {
            (self.points.len() - 1) / 3
        }
    }
}

fn sign(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Indices where the path switches Bezier segments: curvature sign
/// flips, plus wherever the turn accumulated since the last splice
/// reaches the threshold.
fn find_splices(points: &[Point], threshold_rad: f64) -> Vec<usize> {
    let n = points.len();
    let delta = |i: usize| {
        let prev = points[(i + n - 1) % n];
        let next = points[(i + 1) % n];
        signed_angle(points[i] - prev, next - points[i])
    };

    let mut splices = Vec::new();
    let mut running = 0.0f64;
    for i in 0..n {
        let d = delta(i);
        let d_prev = delta((i + n - 1) % n);
        let flips = sign(d) * sign(d_prev) < 0;
        running += d;
        if flips || running.abs() >= threshold_rad {
            splices.push(i);
            running = 0.0;
        }
    }
    splices
}

/// Least-squares cubic through a point run, endpoints fixed.
///
/// Chord-length parameterization; the two free control points solve the
/// 2x2 normal equations. Degenerate runs fall back to straight-line
/// handles at 1/3 and 2/3.
fn fit_cubic(points: &[Point]) -> [Point; 4] {
    let p0 = points[0];
    let p3 = *points.last().unwrap();

    let line_handles = |p0: Point, p3: Point| {
        let third = (p3 - p0) / 3.0;
        [p0, p0 + third, p0 + third * 2.0, p3]
    };

    if points.len() < 2 {
        return line_handles(p0, p3);
    }

    // Chord-length parameter in [0, 1].
    let mut t = Vec::with_capacity(points.len());
    t.push(0.0f64);
    let mut total = 0.0;
    for k in 1..points.len() {
        total += (points[k] - points[k - 1]).hypot();
        t.push(total);
    }
    if total < 1e-10 {
        return line_handles(p0, p3);
    }
    for tk in &mut t {
        *tk /= total;
    }

    // Normal equations for the two middle Bernstein coefficients.
    let mut a11 = 0.0;
    let mut a12 = 0.0;
    let mut a22 = 0.0;
    let mut c1 = kurbo::Vec2::ZERO;
    let mut c2 = kurbo::Vec2::ZERO;
    for (q, &tk) in points.iter().zip(&t) {
        let u = 1.0 - tk;
        let b0 = u * u * u;
        let b1 = 3.0 * tk * u * u;
        let b2 = 3.0 * tk * tk * u;
        let b3 = tk * tk * tk;
        let rhs = q.to_vec2() - p0.to_vec2() * b0 - p3.to_vec2() * b3;
        a11 += b1 * b1;
        a12 += b1 * b2;
        a22 += b2 * b2;
        c1 += rhs * b1;
        c2 += rhs * b2;
    }
    let det = a11 * a22 - a12 * a12;
    if det.abs() < 1e-10 {
        return line_handles(p0, p3);
    }
    let p1 = ((c1 * a22 - c2 * a12) / det).to_point();
    let p2 = ((c2 * a11 - c1 * a12) / det).to_point();

    retract_handles([p0, p1, p2, p3])
}

/// Collapse S-turn handles onto the intersection of the two handle
/// lines. A single cubic cannot represent an inflection; pulling both
/// handles to one point yields the closest monotone-curvature shape.
fn retract_handles(cubic: [Point; 4]) -> [Point; 4] {
    let [a, b, c, d] = cubic;
    let entry = signed_angle(a - d, b - a);
    let exit = signed_angle(b - a, c - b);
    if sign(entry) * sign(exit) >= 0 {
        return cubic;
    }
    match intersect_lines(a, b, d, c) {
        LineCross::At(pt) => [a, pt, pt, d],
        LineCross::Coincident => {
            let mid = b.midpoint(c);
            [a, mid, mid, d]
        }
        LineCross::Parallel => cubic,
    }
}

/// Extract the circular subpath `points[from..=to]` (inclusive).
fn circular_slice(points: &[Point], from: usize, to: usize) -> Vec<Point> {
    let n = points.len();
    let mut out = Vec::new();
    let mut i = from;
    loop {
        out.push(points[i]);
        if i == to {
            break;
        }
        i = (i + 1) % n;
    }
    out
}

/// Fit a closed spline through a smoothed path.
///
/// Returns an empty spline for paths too short to carry a cubic.
pub fn fit_spline(path: &SmoothedPath, splice_threshold_rad: f64) -> Spline {
    let points = &path.points;
    let n = points.len();
    if n < 4 {
        return Spline::default();
    }

    let mut cuts = find_splices(points, splice_threshold_rad);
    if cuts.is_empty() {
        cuts.push(0);
    }
    if cuts.len() == 1 {
        let opposite = (cuts[0] + n / 2) % n;
        cuts.push(opposite);
        cuts.sort_unstable();
    }

    let mut spline = Spline::default();
    for (k, &from) in cuts.iter().enumerate() {
        let to = cuts[(k + 1) % cuts.len()];
        let run = circular_slice(points, from, to);
        let [p0, p1, p2, p3] = fit_cubic(&run);
        if spline.points.is_empty() {
            spline.points.push(p0);
        }
        spline.points.extend([p1, p2, p3]);
    }
    spline
}
