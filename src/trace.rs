//! Layer mask to compound SVG path data.
//!
//! Each emitted layer's pixel set is rendered into a rect-local mask,
//! split into 4-connected components, and traced: the outer boundary
//! clockwise, interior holes counter-clockwise. Every boundary runs
//! through staircase removal and decimation, then either straight to
//! polygon data or through smoothing and cubic fitting.

use crate::binary::{BinaryCluster, BinaryImage};
use crate::config::{PathMode, TraceConfig};
use crate::geom::PointI32;
use crate::hierarchy::Layer;
use crate::simplify::{limit_penalties, remove_staircase};
use crate::smooth::smooth_path;
use crate::spline::fit_spline;
use crate::svg::{write_polygon_subpath, write_spline_subpath};
use crate::walker::{find_boundary_start, walk_path};

/// Components below this pixel count are too small to trace.
const MIN_COMPONENT_AREA: usize = 3;

/// Build the complete path data string for one layer.
pub fn layer_path_data(layer: &Layer, width: usize, config: &TraceConfig) -> String {
    let rect = layer.rect;
    if rect.is_empty() || layer.pixels.is_empty() {
        return String::new();
    }

    // Pixels absorbed after the layer's rect was snapshotted fall
    // outside the mask; the out-of-bounds write simply drops them.
    let mut mask = BinaryImage::new(rect.width() as usize, rect.height() as usize);
    for &i in &layer.pixels {
        let x = (i % width) as i32 - rect.left;
        let y = (i / width) as i32 - rect.top;
        mask.set(x, y, true);
    }

    let mut data = String::new();
    for component in mask.to_clusters() {
        if component.area() < MIN_COMPONENT_AREA {
            continue;
        }
        let offset = PointI32::new(
            rect.left + component.rect.left,
            rect.top + component.rect.top,
        );
        trace_component(&mut data, &component, offset, config);
    }
    data
}

/// Trace one connected component: filled outer shell plus each
/// interior hole.
fn trace_component(data: &mut String, component: &BinaryCluster, offset: PointI32, config: &TraceConfig) {
    let mut main_img = component.to_binary_image();

    // An inverted region is a hole only when it is fully interior;
    // anything reaching the component bounds is the exterior.
    let holes: Vec<BinaryCluster> = main_img
        .negative()
        .to_clusters()
        .into_iter()
        .filter(|c| !c.touches_edge(main_img.width, main_img.height))
        .collect();

    // Fill the holes so the outer walk sees one solid shape.
    for hole in &holes {
        for p in &hole.points {
            main_img.set(p.x, p.y, true);
        }
    }

    if let Some(start) = find_boundary_start(&main_img) {
        let path = walk_path(&main_img, start, true);
        append_subpath(data, &path, offset, true, config);
    }

    for hole in &holes {
        let hole_img = hole.to_binary_image();
        if let Some(start) = find_boundary_start(&hole_img) {
            let path = walk_path(&hole_img, start, false);
            let hole_offset = PointI32::new(offset.x + hole.rect.left, offset.y + hole.rect.top);
            append_subpath(data, &path, hole_offset, false, config);
        }
    }
}

/// Simplify a walked boundary and append it as one subpath.
fn append_subpath(
    data: &mut String,
    path: &[PointI32],
    offset: PointI32,
    clockwise: bool,
    config: &TraceConfig,
) {
    if path.len() < 3 {
        return;
    }
    let shifted: Vec<PointI32> = path
        .iter()
        .map(|p| PointI32::new(p.x + offset.x, p.y + offset.y))
        .collect();
    let cleaned = remove_staircase(&shifted, clockwise);
    let decimated = limit_penalties(&cleaned);

    match config.mode {
        PathMode::Polygon => write_polygon_subpath(data, &decimated),
        PathMode::Spline => {
            let smoothed = smooth_path(&decimated, config);
            let spline = fit_spline(&smoothed, config.splice_threshold_rad());
            if spline.is_empty() {
                // Too few points to carry a cubic: fall back to the
                // straight-line subpath so tiny features still render.
                write_polygon_subpath(data, &decimated);
            } else {
                write_spline_subpath(data, &spline, config.path_precision);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::geom::Rect;

    fn layer(width: usize, pixels: Vec<usize>) -> Layer {
        let mut rect = Rect::default();
        for &i in &pixels {
            rect.add_xy((i % width) as i32, (i / width) as i32);
        }
        Layer {
            color: Color::new(0, 0, 0, 255),
            rect,
            pixels,
        }
    }

    #[test]
    fn tiny_components_produce_no_data() {
        let layer = layer(4, vec![0, 5]);
        let config = TraceConfig::default();
        assert!(layer_path_data(&layer, 4, &config).is_empty());
    }

    #[test]
    fn solid_block_is_one_polygon_subpath() {
        // 3x3 block in a 5-wide image.
        let mut pixels = Vec::new();
        for y in 1..4 {
            for x in 1..4 {
                pixels.push(y * 5 + x);
            }
        }
        let layer = layer(5, pixels);
        let config = TraceConfig {
            mode: PathMode::Polygon,
            ..TraceConfig::default()
        };
        let data = layer_path_data(&layer, 5, &config);
        assert_eq!(data.matches('M').count(), 1);
        assert!(data.starts_with("M1,1 "));
        assert!(data.ends_with("Z "));
    }

    #[test]
    fn interior_hole_becomes_a_second_subpath() {
        // 3x3 ring: 8 pixels around a missing center.
        let mut pixels = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                if !(x == 1 && y == 1) {
                    pixels.push(y * 3 + x);
                }
            }
        }
        let layer = layer(3, pixels);
        let config = TraceConfig {
            mode: PathMode::Polygon,
            ..TraceConfig::default()
        };
        let data = layer_path_data(&layer, 3, &config);
        assert_eq!(data.matches('M').count(), 2);
        assert_eq!(data.matches("Z ").count(), 2);
    }

    #[test]
    fn separate_blobs_become_separate_subpaths() {
        // Two 2x2 blocks with a gap between them (8 pixels, 6-wide).
        let mut pixels = Vec::new();
        for y in 0..2 {
            for x in 0..2 {
                pixels.push(y * 6 + x);
                pixels.push(y * 6 + x + 4);
            }
        }
        let layer = layer(6, pixels);
        let config = TraceConfig {
            mode: PathMode::Polygon,
            ..TraceConfig::default()
        };
        let data = layer_path_data(&layer, 6, &config);
        assert_eq!(data.matches('M').count(), 2);
    }

    #[test]
    fn pixels_outside_the_saved_rect_are_dropped() {
        // Rect covers only the first pixel; the second lands outside.
        let mut l = layer(8, vec![0]);
        l.pixels.push(7);
        let config = TraceConfig {
            mode: PathMode::Polygon,
            ..TraceConfig::default()
        };
        // One stray in-rect pixel is below the component minimum, so
        // the path stays empty rather than panicking.
        assert!(layer_path_data(&l, 8, &config).is_empty());
    }
}
