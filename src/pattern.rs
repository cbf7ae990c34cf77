/// Calibration test pattern.
///
/// A grid of small squares cut to the left of the board (quadrant II) where
/// up to two cutting parameters vary: one across each row, one from row to
/// row. Cutting it once shows which depth, feed or spindle speed gives the
/// cleanest isolation on a given copper board.
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CutoutError, Result};
use crate::gcode::{coord, feed, GcodeWriter, Units};
use crate::geometry::{Rect, Vec2};
use crate::tool::ToolParams;
use crate::toolpath::{fill_path, FillMode, RasterDirection};

/// Column width of the sweep label before its value list.
const SWEEP_LABEL_WIDTH: usize = 30;

/// Largest grid accepted, in squares.
const MAX_SQUARES: u64 = 1_000_000;

/// Parameter varied along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParam {
    #[default]
    None,
    ZCut,
    XySpeed,
    Spindle,
}

impl SweepParam {
    pub fn name(self) -> &'static str {
        match self {
            SweepParam::None => "none",
            SweepParam::ZCut => "z_cut",
            SweepParam::XySpeed => "xy_speed",
            SweepParam::Spindle => "spindle",
        }
    }
}

impl FromStr for SweepParam {
    type Err = String;

    /// Accepts the names or the numeric codes 0 to 3.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(SweepParam::None),
            "z_cut" | "z-cut" | "1" => Ok(SweepParam::ZCut),
            "xy_speed" | "xy-speed" | "2" => Ok(SweepParam::XySpeed),
            "spindle" | "3" => Ok(SweepParam::Spindle),
            other => Err(format!(
                "unknown sweep parameter '{other}' (expected none, z_cut, xy_speed or spindle)"
            )),
        }
    }
}

impl fmt::Display for SweepParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default)]
    pub z_cut_start: f64,
    #[serde(default)]
    pub z_cut_step: f64,
    #[serde(default = "default_xy_speed_start")]
    pub xy_speed_start: f64,
    #[serde(default)]
    pub xy_speed_step: f64,
    #[serde(default = "default_spindle_start")]
    pub spindle_start: u32,
    #[serde(default)]
    pub spindle_step: i32,
    #[serde(default = "default_x_sweep")]
    pub x_sweep: SweepParam,
    #[serde(default = "default_steps")]
    pub x_steps: u32,
    #[serde(default = "default_y_sweep")]
    pub y_sweep: SweepParam,
    #[serde(default = "default_steps")]
    pub y_steps: u32,
    #[serde(default = "default_z_pass")]
    pub z_pass: f64,
    #[serde(default = "default_z_idle")]
    pub z_idle: f64,
    #[serde(default = "default_z_speed")]
    pub z_speed: f64,
    /// Right edge of the grid.
    #[serde(default = "default_x_start")]
    pub x_start: f64,
    /// Bottom edge of the first row.
    #[serde(default)]
    pub y_start: f64,
    #[serde(default = "default_square_size")]
    pub square_size: f64,
    #[serde(default = "default_gap_size")]
    pub gap_size: f64,
    #[serde(default)]
    pub x_idle: f64,
    #[serde(default)]
    pub y_idle: f64,
    /// Hatch the inside of each square after the outline.
    #[serde(default)]
    pub fill: bool,
    #[serde(default = "default_fill_pitch")]
    pub fill_pitch: f64,
    #[serde(default = "default_units")]
    pub units: Units,
    #[serde(default)]
    pub line_numbers: bool,
}

fn default_xy_speed_start() -> f64 {
    4.0
}
fn default_spindle_start() -> u32 {
    10_000
}
fn default_x_sweep() -> SweepParam {
    SweepParam::ZCut
}
fn default_y_sweep() -> SweepParam {
    SweepParam::XySpeed
}
fn default_steps() -> u32 {
    3
}
fn default_z_pass() -> f64 {
    0.05
}
fn default_z_idle() -> f64 {
    0.5
}
fn default_z_speed() -> f64 {
    2.0
}
fn default_x_start() -> f64 {
    -0.15
}
fn default_square_size() -> f64 {
    0.05
}
fn default_gap_size() -> f64 {
    0.05
}
fn default_fill_pitch() -> f64 {
    0.01
}
fn default_units() -> Units {
    Units::Inches
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            z_cut_start: 0.0,
            z_cut_step: 0.0,
            xy_speed_start: default_xy_speed_start(),
            xy_speed_step: 0.0,
            spindle_start: default_spindle_start(),
            spindle_step: 0,
            x_sweep: default_x_sweep(),
            x_steps: default_steps(),
            y_sweep: default_y_sweep(),
            y_steps: default_steps(),
            z_pass: default_z_pass(),
            z_idle: default_z_idle(),
            z_speed: default_z_speed(),
            x_start: default_x_start(),
            y_start: 0.0,
            square_size: default_square_size(),
            gap_size: default_gap_size(),
            x_idle: 0.0,
            y_idle: 0.0,
            fill: false,
            fill_pitch: default_fill_pitch(),
            units: default_units(),
            line_numbers: false,
        }
    }
}

impl PatternConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("square_size", self.square_size),
            ("z_speed", self.z_speed),
            ("fill_pitch", self.fill_pitch),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CutoutError::InvalidMotion { name, value });
            }
        }
        if !self.gap_size.is_finite() || self.gap_size < 0.0 {
            return Err(CutoutError::InvalidMotion {
                name: "gap_size",
                value: self.gap_size,
            });
        }
        let squares = u64::from(self.x_steps) * u64::from(self.y_steps);
        if squares > MAX_SQUARES {
            return Err(CutoutError::Pattern(format!(
                "{} x {} grid has {squares} squares, more than {MAX_SQUARES}",
                self.x_steps, self.y_steps
            )));
        }
        Ok(())
    }

    /// Value of `param` after `n` steps.
    fn swept(&self, param: SweepParam, n: u32) -> String {
        let n = f64::from(n);
        match param {
            SweepParam::None => String::new(),
            SweepParam::ZCut => coord(self.z_cut_start + n * self.z_cut_step),
            SweepParam::XySpeed => feed(self.xy_speed_start + n * self.xy_speed_step),
            SweepParam::Spindle => {
                (i64::from(self.spindle_start) + n as i64 * i64::from(self.spindle_step)).to_string()
            }
        }
    }
}

// ── Grid ─────────────────────────────────────────────────────────────

/// One square of the grid and the parameters it is cut with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSquare {
    pub rect: Rect,
    pub z_cut: f64,
    pub xy_speed: f64,
    pub spindle_rpm: u32,
}

/// Lay out the grid row by row, right to left of `x_start`.
///
/// The X-swept parameter restarts at the beginning of every row and
/// advances per square; the Y-swept parameter advances once per row.
pub fn generate_squares(config: &PatternConfig) -> Result<Vec<PatternSquare>> {
    config.validate()?;
    let pitch = config.square_size + config.gap_size;
    let steps = f64::from(config.x_steps);
    let row_start = config.x_start - steps * config.square_size - (steps - 1.0).max(0.0) * config.gap_size;

    let mut z_cut = config.z_cut_start;
    let mut xy_speed = config.xy_speed_start;
    let mut spindle = i64::from(config.spindle_start);
    let advance = |param: SweepParam, z: &mut f64, xy: &mut f64, s: &mut i64| match param {
        SweepParam::None => {}
        SweepParam::ZCut => *z += config.z_cut_step,
        SweepParam::XySpeed => *xy += config.xy_speed_step,
        SweepParam::Spindle => *s += i64::from(config.spindle_step),
    };

    let mut squares = Vec::with_capacity(config.x_steps as usize * config.y_steps as usize);
    let mut y = config.y_start;
    for _ in 0..config.y_steps {
        match config.x_sweep {
            SweepParam::None => {}
            SweepParam::ZCut => z_cut = config.z_cut_start,
            SweepParam::XySpeed => xy_speed = config.xy_speed_start,
            SweepParam::Spindle => spindle = i64::from(config.spindle_start),
        }
        let mut x = row_start;
        for _ in 0..config.x_steps {
            if !xy_speed.is_finite() || xy_speed <= 0.0 {
                return Err(CutoutError::InvalidMotion {
                    name: "xy_speed",
                    value: xy_speed,
                });
            }
            let spindle_rpm = u32::try_from(spindle)
                .ok()
                .filter(|&rpm| rpm > 0)
                .ok_or(CutoutError::InvalidMotion {
                    name: "spindle",
                    value: spindle as f64,
                })?;
            squares.push(PatternSquare {
                rect: Rect::new(x, y, config.square_size, config.square_size),
                z_cut,
                xy_speed,
                spindle_rpm,
            });
            x += pitch;
            advance(config.x_sweep, &mut z_cut, &mut xy_speed, &mut spindle);
        }
        y += pitch;
        advance(config.y_sweep, &mut z_cut, &mut xy_speed, &mut spindle);
    }
    Ok(squares)
}

/// One-line summary of what varies along `axis`, with every value cut.
pub fn sweep_description(config: &PatternConfig, axis: char) -> String {
    let (param, steps) = if axis.eq_ignore_ascii_case(&'x') {
        (config.x_sweep, config.x_steps)
    } else {
        (config.y_sweep, config.y_steps)
    };
    if param == SweepParam::None {
        return format!("No {axis} axis sweep");
    }
    let label = format!("Sweeping {param} over {axis} axis:");
    let values: Vec<String> = (0..steps).map(|n| config.swept(param, n)).collect();
    format!("{label:<SWEEP_LABEL_WIDTH$} [{}]", values.join(", "))
}

// ── Emission ─────────────────────────────────────────────────────────

/// Write the pattern program. Returns the number of squares cut.
pub fn write_pattern<W: Write>(out: W, config: &PatternConfig) -> Result<usize> {
    let squares = generate_squares(config)?;
    let x_sweep = sweep_description(config, 'X');
    let y_sweep = sweep_description(config, 'Y');
    info!("{x_sweep}");
    info!("{y_sweep}");

    let hatch = if config.fill {
        Some(ToolParams::new(config.fill_pitch, 0.0)?)
    } else {
        None
    };
    let hatch_mode = FillMode::Raster(RasterDirection::Horizontal);

    let mut w = GcodeWriter::new(out, config.line_numbers);
    w.comment("padcam - test pattern")?;
    w.preamble(config.units)?;
    w.blank()?;
    w.comment(&x_sweep)?;
    w.comment(&y_sweep)?;
    w.blank()?;
    w.rapid_z(config.z_idle)?;
    w.spindle_on(config.spindle_start)?;
    w.blank()?;

    for sq in &squares {
        if config.spindle_step != 0 {
            w.spindle_on(sq.spindle_rpm)?;
            w.command("G4 P2", Some("2 second pause"))?;
        }
        let r = sq.rect;
        let lo = r.min();
        let hi = r.max();
        w.rapid_xy(lo)?;
        w.feed_z(sq.z_cut, config.z_speed)?;
        for corner in [
            Vec2::new(hi.x, lo.y),
            hi,
            Vec2::new(lo.x, hi.y),
            lo,
        ] {
            w.feed_xy(corner, sq.xy_speed)?;
        }
        if let Some(tool) = &hatch {
            for p in fill_path(&r, tool, hatch_mode) {
                w.feed_xy(p, sq.xy_speed)?;
            }
        }
        w.rapid_z(config.z_pass)?;
        w.blank()?;
    }

    w.rapid_z(config.z_idle)?;
    w.rapid_xy(Vec2::new(config.x_idle, config.y_idle))?;
    w.spindle_off()?;
    w.flush()?;
    Ok(squares.len())
}
