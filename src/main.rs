//! padcam CLI - turn SVG pad outlines into G-code, or cut a test pattern.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use padcam::gcode::Units;
use padcam::pattern::{PatternConfig, SweepParam};
use padcam::toolpath::{FillStrategy, RasterDirection};
use padcam::CutoutConfig;
use tracing::Level;

#[derive(Parser)]
#[command(name = "padcam", version)]
#[command(about = "Rectangle cutout G-code for PCB pads and stencils", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the rectangles of an SVG file into a cutout program
    Cutout(CutoutArgs),
    /// Write a grid of squares that sweeps cutting parameters
    Pattern(PatternArgs),
}

#[derive(Args)]
struct CutoutArgs {
    /// Input SVG file
    infile: PathBuf,
    /// Output G-code file
    outfile: PathBuf,
    /// JSON file with configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Idle (safe) Z height
    #[arg(long)]
    idle_z: Option<f64>,
    /// Passing Z height above the work
    #[arg(long)]
    pass_z: Option<f64>,
    /// Cutting Z depth
    #[arg(long, allow_hyphen_values = true)]
    cut_z: Option<f64>,
    /// Spindle speed in rpm
    #[arg(long)]
    spindle_rpm: Option<u32>,
    /// Tool diameter
    #[arg(long)]
    tool_diameter: Option<f64>,
    /// Fraction of the tool shared by adjacent passes, in [0, 1)
    #[arg(long)]
    overlap: Option<f64>,
    /// XY cutting feed
    #[arg(long)]
    xy_feed: Option<f64>,
    /// Z plunge feed
    #[arg(long)]
    z_feed: Option<f64>,
    /// Fill strategy: spiral_in or raster
    #[arg(long)]
    fill: Option<FillStrategy>,
    /// Raster sweep direction: auto, horizontal or vertical
    #[arg(long)]
    raster_direction: Option<RasterDirection>,
    /// Force program units (in or mm) instead of the SVG's
    #[arg(long)]
    units: Option<Units>,
    /// Number every command with an N word
    #[arg(long)]
    line_numbers: bool,
}

#[derive(Args)]
struct PatternArgs {
    /// Output G-code file
    outfile: PathBuf,
    /// JSON file with configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, allow_hyphen_values = true)]
    z_cut_start: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    z_cut_step: Option<f64>,
    #[arg(long)]
    xy_speed_start: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    xy_speed_step: Option<f64>,
    #[arg(long)]
    spindle_start: Option<u32>,
    #[arg(long, allow_hyphen_values = true)]
    spindle_step: Option<i32>,
    /// Parameter swept along X: none, z_cut, xy_speed, spindle (or 0-3)
    #[arg(long)]
    x_sweep: Option<SweepParam>,
    #[arg(long)]
    x_steps: Option<u32>,
    /// Parameter swept along Y: none, z_cut, xy_speed, spindle (or 0-3)
    #[arg(long)]
    y_sweep: Option<SweepParam>,
    #[arg(long)]
    y_steps: Option<u32>,
    #[arg(long)]
    z_pass: Option<f64>,
    #[arg(long)]
    z_idle: Option<f64>,
    #[arg(long)]
    z_speed: Option<f64>,
    /// Right edge of the grid
    #[arg(long, allow_hyphen_values = true)]
    x_start: Option<f64>,
    /// Bottom edge of the grid
    #[arg(long, allow_hyphen_values = true)]
    y_start: Option<f64>,
    #[arg(long)]
    square_size: Option<f64>,
    #[arg(long)]
    gap_size: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    x_idle: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    y_idle: Option<f64>,
    /// Hatch the inside of every square
    #[arg(long)]
    fill: bool,
    /// Hatch line spacing
    #[arg(long)]
    fill_pitch: Option<f64>,
    #[arg(long)]
    units: Option<Units>,
    #[arg(long)]
    line_numbers: bool,
}

/// Copy every flag that was given onto the matching config field.
macro_rules! override_fields {
    ($args:expr, $config:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(v) = $args.$field {
                $config.$field = v;
            }
        )*
    };
}

fn read_config_json(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))
}

impl CutoutArgs {
    fn into_config(self) -> Result<CutoutConfig> {
        let mut config = match &self.config {
            Some(path) => CutoutConfig::from_json(&read_config_json(path)?)
                .with_context(|| format!("parsing config {}", path.display()))?,
            None => CutoutConfig::default(),
        };
        override_fields!(
            self,
            config,
            [
                idle_z,
                pass_z,
                cut_z,
                spindle_rpm,
                tool_diameter,
                overlap,
                xy_feed,
                z_feed,
                fill,
                raster_direction,
            ]
        );
        if self.units.is_some() {
            config.units = self.units;
        }
        config.line_numbers |= self.line_numbers;
        Ok(config)
    }
}

impl PatternArgs {
    fn into_config(self) -> Result<PatternConfig> {
        let mut config = match &self.config {
            Some(path) => PatternConfig::from_json(&read_config_json(path)?)
                .with_context(|| format!("parsing config {}", path.display()))?,
            None => PatternConfig::default(),
        };
        override_fields!(
            self,
            config,
            [
                z_cut_start,
                z_cut_step,
                xy_speed_start,
                xy_speed_step,
                spindle_start,
                spindle_step,
                x_sweep,
                x_steps,
                y_sweep,
                y_steps,
                z_pass,
                z_idle,
                z_speed,
                x_start,
                y_start,
                square_size,
                gap_size,
                x_idle,
                y_idle,
                fill_pitch,
                units,
            ]
        );
        config.fill |= self.fill;
        config.line_numbers |= self.line_numbers;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Cutout(args) => {
            let infile = args.infile.clone();
            let outfile = args.outfile.clone();
            let config = args.into_config()?;
            let report = padcam::convert_svg_file(&infile, &outfile, &config).with_context(|| {
                format!("converting {} to {}", infile.display(), outfile.display())
            })?;
            println!(
                "{} rectangles, {} cutting moves ({}) -> {}",
                report.rectangles,
                report.summary.feed_moves,
                report.units,
                outfile.display()
            );
        }
        Commands::Pattern(args) => {
            let outfile = args.outfile.clone();
            let config = args.into_config()?;
            let squares = padcam::write_pattern_file(&outfile, &config)
                .with_context(|| format!("writing test pattern {}", outfile.display()))?;
            println!("{squares} squares -> {}", outfile.display());
        }
    }

    Ok(())
}
