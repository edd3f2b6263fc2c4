//! SVG serialization.
//!
//! Builds the textual envelope around the traced layers: one filled
//! `<path>` per layer, deepest first, inside a fixed-size `<svg>`
//! element. This is a pure string builder with no I/O.

use std::fmt::Write;

use crate::color::Color;
use crate::geom::PointI32;
use crate::spline::Spline;

/// One filled path element: pre-built path data plus its fill color.
#[derive(Debug, Clone)]
pub struct SvgPath {
    pub data: String,
    pub fill: Color,
}

/// Append one spline subpath (`M` + cubic `C` segments + `Z`) to a
/// path data string, formatting coordinates to `precision` decimals.
pub fn write_spline_subpath(out: &mut String, spline: &Spline, precision: usize) {
    if spline.is_empty() {
        return;
    }
    let p = precision;
    let pt = |point: kurbo::Point| format!("{:.p$},{:.p$}", point.x, point.y);

    let _ = write!(out, "M{} ", pt(spline.points[0]));
    for segment in spline.points[1..].chunks_exact(3) {
        let _ = write!(
            out,
            "C{} {} {} ",
            pt(segment[0]),
            pt(segment[1]),
            pt(segment[2]),
        );
    }
    out.push_str("Z ");
}

/// Append one polygon subpath (`M` + `L` runs + `Z`) built from an
/// integer polyline.
pub fn write_polygon_subpath(out: &mut String, points: &[PointI32]) {
    if points.is_empty() {
        return;
    }
    let _ = write!(out, "M{},{} ", points[0].x, points[0].y);
    for p in &points[1..] {
        let _ = write!(out, "L{},{} ", p.x, p.y);
    }
    out.push_str("Z ");
}

/// Serialize the full SVG document.
pub fn render_document(width: usize, height: usize, paths: &[SvgPath]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#,
    );
    for path in paths {
        if path.data.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            r#"<path d="{}" fill="{}"/>"#,
            path.data.trim_end(),
            path.fill.to_hex(),
        );
    }
    let _ = writeln!(out, "</svg>");
    out
}
