//! pictra: raster images → layered SVG vector graphics.
//!
//! Converts an RGBA pixel buffer into an SVG document of filled paths
//! that approximate the image as overlapping or cutout color regions.
//!
//! # Example
//!
//! ```no_run
//! use pictra::{trace_image, TraceConfig};
//! use std::path::Path;
//!
//! let config = TraceConfig::default();
//! let svg = trace_image(Path::new("input.png"), &config)?;
//! # Ok::<(), pictra::TraceError>(())
//! ```
//!
//! The pipeline: transparency keying, color quantization, connected-
//! component clustering, hierarchical merge into layers, boundary
//! tracing, staircase removal, smoothing, and cubic Bezier fitting.

#![forbid(unsafe_code)]

mod binary;
mod cluster;
mod color;
mod config;
mod geom;
mod hierarchy;
mod keying;
mod simplify;
mod smooth;
mod spline;
mod svg;
mod trace;
mod walker;

pub mod error;

// Re-export kurbo so downstream users share the geometry types.
pub use kurbo;

pub use color::Color;
pub use config::{ColorMode, Hierarchical, PathMode, TraceConfig};
pub use error::TraceError;

use std::path::Path;

/// Counters describing one trace, for progress reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceStats {
    /// Connected components found by the clustering scan.
    pub clusters: usize,
    /// Clusters emitted as output layers.
    pub layers: usize,
    /// Layers that produced non-empty path data.
    pub paths: usize,
    /// Whether transparency keying was applied.
    pub keyed: bool,
}

/// Trace an RGBA buffer into an SVG document string.
///
/// `pixels` is row-major RGBA, top-left origin, and is mutated in
/// place by keying and binary conversion; pass a copy to preserve it.
/// Degenerate inputs produce an empty-but-valid SVG, never an error.
pub fn vtrace(pixels: &mut [u8], width: usize, height: usize, config: &TraceConfig) -> String {
    vtrace_with_stats(pixels, width, height, config).0
}

/// Like [`vtrace`], additionally returning pipeline counters.
pub fn vtrace_with_stats(
    pixels: &mut [u8],
    width: usize,
    height: usize,
    config: &TraceConfig,
) -> (String, TraceStats) {
    let mut stats = TraceStats::default();
    if width == 0 || height == 0 {
        return (svg::render_document(width, height, &[]), stats);
    }
    debug_assert_eq!(pixels.len(), width * height * 4);

    // Stage 1: transparency keying.
    let key = if keying::should_key(pixels, width, height) {
        let key = keying::find_unused_color(pixels);
        keying::apply_key_color(pixels, &key);
        Some(key)
    } else {
        None
    };
    stats.keyed = key.is_some();

    // Stage 2: optional black/white collapse.
    if config.color_mode == ColorMode::Binary {
        keying::binarize(pixels, key.as_ref());
    }

    // Stages 3-4: clustering and adjacency.
    let clustering = cluster::build_clusters(pixels, width, height, key.as_ref(), config);
    stats.clusters = clustering.table.len();
    let adjacency =
        cluster::build_adjacency(&clustering.labels, width, height, clustering.table.len());

    // Stages 5-6: hierarchical merge and pixel reassignment.
    let hierarchy = hierarchy::build_hierarchy(
        clustering.table,
        adjacency,
        width,
        height,
        key.is_some(),
        config,
    );
    stats.layers = hierarchy.output.len();
    let layers = hierarchy::assign_pixels(&clustering.labels, &hierarchy, config.hierarchical);

    // Stages 7-8: boundary extraction and path fitting per layer.
    let paths: Vec<svg::SvgPath> = layers
        .iter()
        .map(|layer| svg::SvgPath {
            data: trace::layer_path_data(layer, width, config),
            fill: layer.color,
        })
        .collect();
    stats.paths = paths.iter().filter(|p| !p.data.is_empty()).count();

    // Stage 9: SVG assembly, deepest layer first.
    (svg::render_document(width, height, &paths), stats)
}

/// Convenience entry: decode an image file and trace it.
pub fn trace_image(image_path: &Path, config: &TraceConfig) -> Result<String, TraceError> {
    let (mut pixels, width, height) = load_rgba(image_path)?;
    Ok(vtrace(&mut pixels, width, height, config))
}

/// Decode any `image`-supported file into a raw RGBA buffer.
pub fn load_rgba(image_path: &Path) -> Result<(Vec<u8>, usize, usize), TraceError> {
    let img = image::ImageReader::open(image_path)
        .map_err(|e| TraceError::ImageLoad(e.to_string()))?
        .decode()
        .map_err(|e| TraceError::ImageLoad(e.to_string()))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    Ok((img.into_raw(), width as usize, height as usize))
}
