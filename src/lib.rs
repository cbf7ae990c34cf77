//! padcam: pad cutouts for stencils and PCB isolation, in WebAssembly or
//! on the command line.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Extract      │ ──▶ │  Tour         │ ──▶ │  Fill         │ ──▶ │  Emit         │
//! │  (SVG rects)  │     │  (nearest     │     │  (spiral-in / │     │  (G-code)     │
//! │               │     │   neighbour)  │     │   raster)     │     │               │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Each stage is a module boundary working on plain [`geometry::Rect`]s and
//! waypoint iterators. The [`pattern`] module reuses the emitter to write
//! calibration grids without any SVG input.

pub mod error;
pub mod gcode;
pub mod geometry;
pub mod pattern;
pub mod svg;
pub mod tool;
pub mod toolpath;
pub mod tour;

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use error::{CutoutError, Result};
use gcode::{emit_program, GcodeParams, HeightProfile, MotionParams, ProgramSummary, Units, Visit};
use geometry::{BoundingBox2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tool::ToolParams;
use toolpath::{fill_path, FillMode, FillStrategy, RasterDirection};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;

// ── Public parameter struct (JSON from JS or --config) ───────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoutConfig {
    #[serde(default = "default_idle_z")]
    pub idle_z: f64,
    #[serde(default = "default_pass_z")]
    pub pass_z: f64,
    #[serde(default)]
    pub cut_z: f64,
    #[serde(default = "default_spindle_rpm")]
    pub spindle_rpm: u32,
    #[serde(default = "default_tool_diameter")]
    pub tool_diameter: f64,
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    #[serde(default = "default_xy_feed")]
    pub xy_feed: f64,
    #[serde(default = "default_z_feed")]
    pub z_feed: f64,
    #[serde(default)]
    pub fill: FillStrategy,
    #[serde(default)]
    pub raster_direction: RasterDirection,
    /// Forces the program units; otherwise taken from the SVG.
    #[serde(default)]
    pub units: Option<Units>,
    #[serde(default)]
    pub line_numbers: bool,
}

fn default_idle_z() -> f64 {
    1.0
}
fn default_pass_z() -> f64 {
    0.1
}
fn default_spindle_rpm() -> u32 {
    10_000
}
fn default_tool_diameter() -> f64 {
    0.015
}
fn default_overlap() -> f64 {
    0.15
}
fn default_xy_feed() -> f64 {
    4.0
}
fn default_z_feed() -> f64 {
    0.4
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            idle_z: default_idle_z(),
            pass_z: default_pass_z(),
            cut_z: 0.0,
            spindle_rpm: default_spindle_rpm(),
            tool_diameter: default_tool_diameter(),
            overlap: default_overlap(),
            xy_feed: default_xy_feed(),
            z_feed: default_z_feed(),
            fill: FillStrategy::default(),
            raster_direction: RasterDirection::default(),
            units: None,
            line_numbers: false,
        }
    }
}

impl CutoutConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check everything that would make the program unusable.
    pub fn validate(&self) -> Result<()> {
        self.tool()?;
        if self.spindle_rpm == 0 {
            return Err(CutoutError::InvalidMotion {
                name: "spindle_rpm",
                value: 0.0,
            });
        }
        for (name, value) in [("xy_feed", self.xy_feed), ("z_feed", self.z_feed)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CutoutError::InvalidMotion { name, value });
            }
        }
        for (name, value) in [
            ("idle_z", self.idle_z),
            ("pass_z", self.pass_z),
            ("cut_z", self.cut_z),
        ] {
            if !value.is_finite() {
                return Err(CutoutError::InvalidMotion { name, value });
            }
        }
        Ok(())
    }

    pub fn tool(&self) -> Result<ToolParams> {
        ToolParams::new(self.tool_diameter, self.overlap)
    }

    pub fn heights(&self) -> HeightProfile {
        HeightProfile {
            idle_z: self.idle_z,
            pass_z: self.pass_z,
            cut_z: self.cut_z,
        }
    }

    pub fn motion(&self) -> MotionParams {
        MotionParams {
            spindle_rpm: self.spindle_rpm,
            xy_feed: self.xy_feed,
            z_feed: self.z_feed,
        }
    }

    pub fn fill_mode(&self) -> FillMode {
        self.fill.with_direction(self.raster_direction)
    }

    /// Units for a document whose root size carries `svg_units`.
    pub fn resolve_units(&self, svg_units: &str) -> Units {
        if let Some(units) = self.units {
            return units;
        }
        Units::from_svg(svg_units).unwrap_or_else(|| {
            warn!(svg_units, "units are not inches or millimeters, assuming millimeters");
            Units::Millimeters
        })
    }

    pub fn gcode_params(&self, units: Units) -> GcodeParams {
        GcodeParams {
            units,
            heights: self.heights(),
            motion: self.motion(),
            line_numbers: self.line_numbers,
            home: Vec2::ORIGIN,
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────

/// Outcome of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutoutReport {
    pub units: Units,
    pub rectangles: usize,
    pub summary: ProgramSummary,
}

fn check_rects(rects: &[Rect]) -> Result<()> {
    match rects.iter().position(|r| !r.is_valid()) {
        Some(index) => Err(CutoutError::InvalidRectangle {
            index,
            width: rects[index].width,
            height: rects[index].height,
        }),
        None => Ok(()),
    }
}

/// Tour, fill and emit `rects` into `out`.
pub fn generate_program<W: Write>(
    out: W,
    rects: &[Rect],
    config: &CutoutConfig,
    units: Units,
) -> Result<ProgramSummary> {
    config.validate()?;
    check_rects(rects)?;
    let tool = config.tool()?;
    let mode = config.fill_mode();

    let order = tour::plan_tour(rects);
    debug!(
        rectangles = rects.len(),
        travel = tour::travel_distance(rects, &order),
        "tour planned"
    );
    let visits = order.into_iter().map(|idx| {
        let rect = rects[idx];
        let path = fill_path(&rect, &tool, mode);
        debug!(index = idx, ?rect, passes = path.passes(), waypoints = path.len(), "fill");
        Visit { rect, path }
    });

    Ok(emit_program(out, visits, &config.gcode_params(units))?)
}

/// Convert SVG text to a complete program held in memory.
pub fn svg_to_gcode(svg_text: &str, config: &CutoutConfig) -> Result<(String, CutoutReport)> {
    config.validate()?;
    let doc = svg::parse_svg(svg_text)?;
    let units = config.resolve_units(&doc.units);
    let mut buf = Vec::with_capacity(4096);
    let summary = generate_program(&mut buf, &doc.rects, config, units)?;
    let report = CutoutReport {
        units,
        rectangles: doc.rects.len(),
        summary,
    };
    Ok((String::from_utf8_lossy(&buf).into_owned(), report))
}

/// Ordered fill polylines for every rectangle, as drawn by a preview.
pub fn preview_polylines(svg_text: &str, config: &CutoutConfig) -> Result<Vec<Vec<[f64; 2]>>> {
    config.validate()?;
    let doc = svg::parse_svg(svg_text)?;
    check_rects(&doc.rects)?;
    let tool = config.tool()?;
    let mode = config.fill_mode();
    Ok(tour::plan_tour(&doc.rects)
        .into_iter()
        .map(|idx| {
            fill_path(&doc.rects[idx], &tool, mode)
                .map(|p| [p.x, p.y])
                .collect()
        })
        .collect())
}

/// Run `write` against a temporary file beside `outfile`, then rename it
/// into place. On error the temporary file is removed and `outfile` is left
/// untouched.
pub fn write_atomically<T, F>(outfile: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let dir = match outfile.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let value = {
        let mut out = BufWriter::new(tmp.as_file_mut());
        let value = write(&mut out)?;
        out.flush()?;
        value
    };
    tmp.persist(outfile).map_err(|e| CutoutError::Io(e.error))?;
    Ok(value)
}

/// Write the calibration pattern to `outfile`. Returns the square count.
pub fn write_pattern_file(outfile: &Path, config: &pattern::PatternConfig) -> Result<usize> {
    let squares = write_atomically(outfile, |out| pattern::write_pattern(out, config))?;
    info!(squares, out = %outfile.display(), "test pattern written");
    Ok(squares)
}

/// Read `infile`, write the program to `outfile`.
///
/// The configuration is checked before either file is touched, and the
/// program goes to a temporary file beside `outfile` that is renamed into
/// place only once complete.
pub fn convert_svg_file(infile: &Path, outfile: &Path, config: &CutoutConfig) -> Result<CutoutReport> {
    config.validate()?;

    let svg_text = fs::read_to_string(infile)?;
    let doc = svg::parse_svg(&svg_text)?;
    let units = config.resolve_units(&doc.units);

    match BoundingBox2::from_rects(&doc.rects) {
        Some(bounds) => info!(
            rectangles = doc.rects.len(),
            min_x = bounds.min.x,
            min_y = bounds.min.y,
            max_x = bounds.max.x,
            max_y = bounds.max.y,
            %units,
            "extracted rectangles"
        ),
        None => warn!(file = %infile.display(), "no rectangles found, writing an empty program"),
    }

    let summary = write_atomically(outfile, |out| generate_program(out, &doc.rects, config, units))?;

    info!(
        visits = summary.visits,
        feed_moves = summary.feed_moves,
        rapid_moves = summary.rapid_moves,
        out = %outfile.display(),
        "program written"
    );
    Ok(CutoutReport {
        units,
        rectangles: doc.rects.len(),
        summary,
    })
}

// ── WASM entry points ────────────────────────────────────────────────

fn config_from_js(config_json: &str) -> std::result::Result<CutoutConfig, JsValue> {
    if config_json.trim().is_empty() {
        return Ok(CutoutConfig::default());
    }
    CutoutConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Process an SVG string and return G-code.
#[wasm_bindgen]
pub fn process_svg(svg_text: &str, config_json: &str) -> std::result::Result<String, JsValue> {
    let config = config_from_js(config_json)?;
    svg_to_gcode(svg_text, &config)
        .map(|(gcode, _)| gcode)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Return fill polylines as JSON (for the 2-D preview canvas).
#[wasm_bindgen]
pub fn preview_svg(svg_text: &str, config_json: &str) -> std::result::Result<String, JsValue> {
    let config = config_from_js(config_json)?;
    let paths = preview_polylines(svg_text, &config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&paths).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_PAD: &str = r#"<svg width="4in" height="3in">
        <path d="M 1,1 L 1.5,1 L 1.5,1.25 L 1,1.25 Z"/></svg>"#;

    #[test]
    fn test_config_defaults() {
        let config = CutoutConfig::default();
        assert_eq!(config.spindle_rpm, 10_000);
        assert!((config.tool_diameter - 0.015).abs() < 1e-12);
        assert_eq!(config.fill, FillStrategy::SpiralIn);
        assert!(config.units.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let config = CutoutConfig::from_json(r#"{"fill": "raster", "raster_direction": "vertical", "units": "mm"}"#)
            .unwrap();
        assert_eq!(config.fill_mode(), FillMode::Raster(RasterDirection::Vertical));
        assert_eq!(config.units, Some(Units::Millimeters));
        assert!((config.idle_z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_config_empty_json_is_default() {
        assert_eq!(CutoutConfig::from_json("{}").unwrap(), CutoutConfig::default());
    }

    #[test]
    fn test_config_bad_json() {
        assert!(matches!(
            CutoutConfig::from_json(r#"{"overlap": "lots"}"#),
            Err(CutoutError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_motion() {
        let config = CutoutConfig {
            xy_feed: 0.0,
            ..CutoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CutoutError::InvalidMotion { name: "xy_feed", .. })
        ));
        let config = CutoutConfig {
            spindle_rpm: 0,
            ..CutoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CutoutError::InvalidMotion { name: "spindle_rpm", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_full_overlap() {
        let config = CutoutConfig {
            overlap: 1.0,
            ..CutoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(CutoutError::InvalidOverlap { .. })));
    }

    #[test]
    fn test_resolve_units() {
        let config = CutoutConfig::default();
        assert_eq!(config.resolve_units("in"), Units::Inches);
        assert_eq!(config.resolve_units("mm"), Units::Millimeters);
        assert_eq!(config.resolve_units("px"), Units::Millimeters);
        let forced = CutoutConfig {
            units: Some(Units::Inches),
            ..CutoutConfig::default()
        };
        assert_eq!(forced.resolve_units("mm"), Units::Inches);
    }

    #[test]
    fn test_svg_to_gcode_inches() {
        let (gcode, report) = svg_to_gcode(ONE_PAD, &CutoutConfig::default()).unwrap();
        assert_eq!(report.units, Units::Inches);
        assert_eq!(report.rectangles, 1);
        assert_eq!(report.summary.visits, 1);
        assert!(gcode.contains("G20"));
        assert!(gcode.contains("G0 X1.00000 Y1.00000"));
        assert!(gcode.contains("M3 S10000"));
    }

    #[test]
    fn test_generate_program_rejects_invalid_rect() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(0.0, 0.0, -1.0, 1.0)];
        let mut buf = Vec::new();
        let err = generate_program(&mut buf, &rects, &CutoutConfig::default(), Units::Inches).unwrap_err();
        assert!(matches!(err, CutoutError::InvalidRectangle { index: 1, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_generate_program_visits_in_tour_order() {
        let rects = [Rect::new(5.0, 0.0, 0.5, 0.5), Rect::new(1.0, 0.0, 0.5, 0.5)];
        let mut buf = Vec::new();
        generate_program(&mut buf, &rects, &CutoutConfig::default(), Units::Inches).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let near = text.find("G0 X1.00000 Y0.00000").unwrap();
        let far = text.find("G0 X5.00000 Y0.00000").unwrap();
        assert!(near < far);
    }

    #[test]
    fn test_preview_polylines() {
        let config = CutoutConfig {
            fill: FillStrategy::Raster,
            tool_diameter: 0.1,
            overlap: 0.0,
            ..CutoutConfig::default()
        };
        let paths = preview_polylines(ONE_PAD, &config).unwrap();
        assert_eq!(paths.len(), 1);
        // 0.5 x 0.25 pad, horizontal sweeps 0.1 apart: 3 sweeps
        assert_eq!(paths[0].len(), 6);
        let [x, y] = paths[0][0];
        assert!((x - 1.0).abs() < 1e-9 && (y - 1.05).abs() < 1e-9);
    }
}
