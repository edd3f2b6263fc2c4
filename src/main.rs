use clap::Parser;
use pictra::{ColorMode, Hierarchical, PathMode, TraceConfig};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pictra", about = "Raster image to layered SVG vector tracer")]
struct Cli {
    /// Input image path (PNG, JPEG, BMP, ...)
    #[arg(short, long)]
    input: PathBuf,

    /// Output SVG path
    #[arg(short, long)]
    output: PathBuf,

    /// Preset: bw, poster, photo (overrides the clustering flags)
    #[arg(long)]
    preset: Option<String>,

    /// Speckle filter size in pixels (squared into an area threshold)
    #[arg(long, default_value = "4")]
    filter_speckle: usize,

    /// Color precision in significant bits per channel (1-8)
    #[arg(long, default_value = "6")]
    color_precision: i32,

    /// Color difference between layers (0 enables diagonal clustering)
    #[arg(long, default_value = "16")]
    layer_difference: i32,

    /// Corner detection threshold in degrees
    #[arg(long, default_value = "60")]
    corner_threshold: i32,

    /// Segment length below which smoothing stops subdividing
    #[arg(long, default_value = "4.0")]
    length_threshold: f64,

    /// Cumulative turning in degrees that starts a new curve segment
    #[arg(long, default_value = "45")]
    splice_threshold: i32,

    /// Maximum smoothing passes
    #[arg(long, default_value = "10")]
    max_iterations: usize,

    /// Decimal places for path coordinates
    #[arg(long, default_value = "2")]
    path_precision: usize,

    /// Path geometry: spline or polygon
    #[arg(long, default_value = "spline")]
    mode: String,

    /// Color handling: color or binary
    #[arg(long, default_value = "color")]
    colormode: String,

    /// Layering: stacked or cutout
    #[arg(long, default_value = "stacked")]
    hierarchical: String,
}

impl Cli {
    fn to_config(&self) -> Result<TraceConfig, String> {
        let mut config = TraceConfig {
            filter_speckle: self.filter_speckle,
            color_precision: self.color_precision,
            layer_difference: self.layer_difference,
            corner_threshold: self.corner_threshold,
            length_threshold: self.length_threshold,
            splice_threshold: self.splice_threshold,
            max_iterations: self.max_iterations,
            path_precision: self.path_precision,
            mode: match self.mode.as_str() {
                "spline" => PathMode::Spline,
                "polygon" => PathMode::Polygon,
                other => return Err(format!("unknown mode '{other}' (spline, polygon)")),
            },
            color_mode: match self.colormode.as_str() {
                "color" => ColorMode::Color,
                "binary" => ColorMode::Binary,
                other => return Err(format!("unknown colormode '{other}' (color, binary)")),
            },
            hierarchical: match self.hierarchical.as_str() {
                "stacked" => Hierarchical::Stacked,
                "cutout" => Hierarchical::Cutout,
                other => return Err(format!("unknown hierarchical '{other}' (stacked, cutout)")),
            },
        };

        if let Some(preset) = &self.preset {
            match preset.as_str() {
                "bw" => {
                    config.color_mode = ColorMode::Binary;
                    config.filter_speckle = 4;
                }
                "poster" => {
                    config.color_mode = ColorMode::Color;
                    config.color_precision = 8;
                    config.filter_speckle = 4;
                    config.layer_difference = 16;
                }
                "photo" => {
                    config.color_mode = ColorMode::Color;
                    config.color_precision = 8;
                    config.filter_speckle = 10;
                    config.layer_difference = 48;
                }
                other => return Err(format!("unknown preset '{other}' (bw, poster, photo)")),
            }
        }

        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.to_config()?;

    eprintln!();
    eprintln!("  pictra \u{00b7} {}", cli.input.display());
    eprintln!();

    let t_start = Instant::now();
    let (mut pixels, width, height) = pictra::load_rgba(&cli.input)?;
    eprintln!("  Load        {}x{} px", width, height);

    let (svg, stats) = pictra::vtrace_with_stats(&mut pixels, width, height, &config);
    let mode = match config.mode {
        PathMode::Spline => "spline",
        PathMode::Polygon => "polygon",
    };
    eprintln!(
        "  Trace       {} clusters \u{2192} {} layers \u{00b7} {} paths ({}{})",
        stats.clusters,
        stats.layers,
        stats.paths,
        mode,
        if stats.keyed { ", keyed" } else { "" },
    );

    std::fs::write(&cli.output, &svg)
        .map_err(|e| pictra::TraceError::OutputWrite(e.to_string()))?;
    let elapsed = t_start.elapsed().as_millis();
    eprintln!("  Result      {} bytes  ({}ms)", svg.len(), elapsed);
    eprintln!();
    eprintln!("  \u{2713} {}", cli.output.display());
    eprintln!();

    Ok(())
}
