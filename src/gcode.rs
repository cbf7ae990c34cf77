/// G-code emitter.
///
/// [`GcodeWriter`] holds the textual conventions (number formats, comments,
/// optional line numbers) and is shared with the test-pattern generator.
/// [`emit_program`] drives it over an ordered set of rectangle visits and
/// owns the Z choreography around each fill.
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::{Rect, Vec2};

/// Decimal places for coordinates.
pub const COORD_PRECISION: usize = 5;
/// Decimal places for feed rates.
pub const FEED_PRECISION: usize = 4;

// ── Parameters ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "in")]
    Inches,
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
}

impl Units {
    /// Units named by an SVG length suffix, when they map to a G-code mode.
    pub fn from_svg(suffix: &str) -> Option<Self> {
        match suffix {
            "in" => Some(Units::Inches),
            "mm" => Some(Units::Millimeters),
            _ => None,
        }
    }

    fn code(self) -> (&'static str, &'static str) {
        match self {
            Units::Inches => ("G20", "inches"),
            Units::Millimeters => ("G21", "millimeters"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Ok(Units::Inches),
            "mm" | "millimeter" | "millimeters" => Ok(Units::Millimeters),
            other => Err(format!("unknown units '{other}' (expected in or mm)")),
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::Inches => "in",
            Units::Millimeters => "mm",
        })
    }
}

/// The three Z levels of every visit. Taken as given; no ordering is
/// enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightProfile {
    pub idle_z: f64,
    pub pass_z: f64,
    pub cut_z: f64,
}

impl Default for HeightProfile {
    fn default() -> Self {
        Self {
            idle_z: 1.0,
            pass_z: 0.1,
            cut_z: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    pub spindle_rpm: u32,
    pub xy_feed: f64,
    pub z_feed: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            spindle_rpm: 10_000,
            xy_feed: 4.0,
            z_feed: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcodeParams {
    pub units: Units,
    pub heights: HeightProfile,
    pub motion: MotionParams,
    /// Prefix every command with an `N` word.
    pub line_numbers: bool,
    /// Where the machine parks at the end of the program.
    pub home: Vec2,
}

impl Default for GcodeParams {
    fn default() -> Self {
        Self {
            units: Units::Inches,
            heights: HeightProfile::default(),
            motion: MotionParams::default(),
            line_numbers: false,
            home: Vec2::ORIGIN,
        }
    }
}

// ── Number formatting ────────────────────────────────────────────────

/// Format with `precision` decimals, never printing negative zero.
pub fn format_number(value: f64, precision: usize) -> String {
    let s = format!("{:.prec$}", value, prec = precision);
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => s,
    }
}

pub fn coord(value: f64) -> String {
    format_number(value, COORD_PRECISION)
}

pub fn feed(value: f64) -> String {
    format_number(value, FEED_PRECISION)
}

// ── Writer ───────────────────────────────────────────────────────────

/// Line-oriented G-code writer.
pub struct GcodeWriter<W: Write> {
    out: W,
    line_numbers: bool,
    next_line: u32,
    feed_moves: usize,
    rapid_moves: usize,
}

impl<W: Write> GcodeWriter<W> {
    pub fn new(out: W, line_numbers: bool) -> Self {
        Self {
            out,
            line_numbers,
            next_line: 10,
            feed_moves: 0,
            rapid_moves: 0,
        }
    }

    /// Write one command, with a trailing `(comment)` when given.
    pub fn command(&mut self, cmd: &str, comment: Option<&str>) -> io::Result<()> {
        if self.line_numbers {
            write!(self.out, "N{} ", self.next_line)?;
            self.next_line += 10;
        }
        match comment {
            Some(c) => writeln!(self.out, "{cmd} ({c})"),
            None => writeln!(self.out, "{cmd}"),
        }
    }

    /// A line holding only a comment.
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "({text})")
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn rapid_z(&mut self, z: f64) -> io::Result<()> {
        self.rapid_moves += 1;
        self.command(&format!("G0 Z{}", coord(z)), None)
    }

    pub fn rapid_xy(&mut self, p: Vec2) -> io::Result<()> {
        self.rapid_moves += 1;
        self.command(&format!("G0 X{} Y{}", coord(p.x), coord(p.y)), None)
    }

    pub fn feed_z(&mut self, z: f64, f: f64) -> io::Result<()> {
        self.feed_moves += 1;
        self.command(&format!("G1 Z{} F{}", coord(z), feed(f)), None)
    }

    pub fn feed_xy(&mut self, p: Vec2, f: f64) -> io::Result<()> {
        self.feed_moves += 1;
        self.command(
            &format!("G1 X{} Y{} F{}", coord(p.x), coord(p.y), feed(f)),
            None,
        )
    }

    /// Units, absolute positioning, feed mode.
    pub fn preamble(&mut self, units: Units) -> io::Result<()> {
        let (code, name) = units.code();
        self.command(code, Some(name))?;
        self.command("G90", Some("absolute positioning"))?;
        self.command("G94", Some("units per minute feed"))
    }

    pub fn spindle_on(&mut self, rpm: u32) -> io::Result<()> {
        self.command(&format!("M3 S{rpm}"), Some("spindle on"))
    }

    pub fn spindle_off(&mut self) -> io::Result<()> {
        self.command("M5", Some("spindle off"))
    }

    pub fn feed_moves(&self) -> usize {
        self.feed_moves
    }

    pub fn rapid_moves(&self) -> usize {
        self.rapid_moves
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

// ── Program emission ─────────────────────────────────────────────────

/// A rectangle and the fill that clears it.
#[derive(Debug, Clone)]
pub struct Visit<P> {
    pub rect: Rect,
    pub path: P,
}

/// Counts gathered while emitting a program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgramSummary {
    pub visits: usize,
    pub feed_moves: usize,
    pub rapid_moves: usize,
}

/// Write a complete program for `visits`, in order.
///
/// Every visit rapids above its first waypoint at idle height, drops to the
/// pass height, plunges at the Z feed and follows the waypoints at the XY
/// feed, then retracts to pass and idle height. Outside a fill the tool
/// only ever moves at idle height.
pub fn emit_program<W, I, P>(out: W, visits: I, params: &GcodeParams) -> io::Result<ProgramSummary>
where
    W: Write,
    I: IntoIterator<Item = Visit<P>>,
    P: IntoIterator<Item = Vec2>,
{
    let h = params.heights;
    let m = params.motion;
    let mut w = GcodeWriter::new(out, params.line_numbers);
    let mut summary = ProgramSummary::default();

    w.comment("padcam - generated G-code")?;
    w.preamble(params.units)?;
    w.rapid_z(h.idle_z)?;
    w.spindle_on(m.spindle_rpm)?;
    w.blank()?;

    for (idx, visit) in visits.into_iter().enumerate() {
        let mut path = visit.path.into_iter();
        let Some(entry) = path.next() else {
            warn!(index = idx, rect = ?visit.rect, "empty fill, rectangle skipped");
            continue;
        };
        w.comment(&format!(
            "Rectangle {}: {} x {} at {}, {}",
            summary.visits + 1,
            coord(visit.rect.width),
            coord(visit.rect.height),
            coord(visit.rect.x),
            coord(visit.rect.y)
        ))?;
        w.rapid_xy(entry)?;
        w.rapid_z(h.pass_z)?;
        w.feed_z(h.cut_z, m.z_feed)?;
        for p in path {
            w.feed_xy(p, m.xy_feed)?;
        }
        w.rapid_z(h.pass_z)?;
        w.rapid_z(h.idle_z)?;
        w.blank()?;
        summary.visits += 1;
    }

    w.spindle_off()?;
    w.rapid_z(h.idle_z)?;
    w.rapid_xy(params.home)?;
    w.command("M2", Some("program end"))?;
    w.flush()?;

    summary.feed_moves = w.feed_moves();
    summary.rapid_moves = w.rapid_moves();
    Ok(summary)
}

/// Emit a program into a `String`.
pub fn emit_gcode<I, P>(visits: I, params: &GcodeParams) -> io::Result<String>
where
    I: IntoIterator<Item = Visit<P>>,
    P: IntoIterator<Item = Vec2>,
{
    let mut buf = Vec::with_capacity(4096);
    emit_program(&mut buf, visits, params)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
