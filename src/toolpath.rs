/// Fill generation for a single rectangle.
///
/// A fill is the ordered list of XY waypoints the cutter follows at cutting
/// height. Two strategies exist, spiral-in and raster, selected once through
/// [`FillMode`] and dispatched by [`fill_path`]. Waypoints are computed on
/// demand from their index so memory use does not grow with fill density.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Vec2, MIN_SEGMENT};
use crate::tool::ToolParams;

// ── Mode selection ───────────────────────────────────────────────────

/// Which way raster sweeps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterDirection {
    /// Parallel to the longer side (fewer, longer sweeps).
    #[default]
    Auto,
    /// Parallel to the rectangle's width.
    Horizontal,
    /// Parallel to the rectangle's height.
    Vertical,
}

impl RasterDirection {
    /// Concrete direction for `rect`; `Auto` picks horizontal on a tie.
    fn is_horizontal(self, rect: &Rect) -> bool {
        match self {
            RasterDirection::Auto => rect.width >= rect.height,
            RasterDirection::Horizontal => true,
            RasterDirection::Vertical => false,
        }
    }
}

impl FromStr for RasterDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            other => Err(format!(
                "unknown raster direction '{other}' (expected auto, horizontal or vertical)"
            )),
        }
    }
}

impl fmt::Display for RasterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RasterDirection::Auto => "auto",
            RasterDirection::Horizontal => "horizontal",
            RasterDirection::Vertical => "vertical",
        })
    }
}

/// Fill strategy as named in configuration, without raster direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    #[default]
    SpiralIn,
    Raster,
}

impl FillStrategy {
    pub fn with_direction(self, direction: RasterDirection) -> FillMode {
        match self {
            FillStrategy::SpiralIn => FillMode::SpiralIn,
            FillStrategy::Raster => FillMode::Raster(direction),
        }
    }
}

impl FromStr for FillStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spiral" | "spiral_in" | "spiral-in" => Ok(Self::SpiralIn),
            "raster" | "zigzag" => Ok(Self::Raster),
            other => Err(format!(
                "unknown fill '{other}' (expected spiral-in or raster)"
            )),
        }
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FillStrategy::SpiralIn => "spiral-in",
            FillStrategy::Raster => "raster",
        })
    }
}

/// Resolved fill mode handed to [`fill_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    SpiralIn,
    Raster(RasterDirection),
}

// ── Waypoint sequence ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Straight pass; collapses to one waypoint when `from == to`.
    Line { from: Vec2, to: Vec2 },
    /// Concentric closed rings, optionally followed by a centring pass.
    Spiral {
        rect: Rect,
        step: f64,
        rings: usize,
        centre: Option<(Vec2, Vec2)>,
    },
    /// Boustrophedon sweeps.
    Raster {
        rect: Rect,
        step: f64,
        sweeps: usize,
        horizontal: bool,
    },
}

/// Points per spiral ring: start corner, three corners, back to start.
const RING_POINTS: usize = 5;

/// Thinnest ring worth cutting, as a fraction of the step-over.
const MIN_RING_FRACTION: f64 = 0.01;

/// Lazily generated fill for one rectangle.
#[derive(Debug, Clone)]
pub struct FillPath {
    pattern: Pattern,
    next: usize,
    len: usize,
}

impl FillPath {
    fn new(pattern: Pattern) -> Self {
        let len = match pattern {
            Pattern::Line { from, to } => line_len(from, to),
            Pattern::Spiral { rings, centre, .. } => {
                rings * RING_POINTS + centre.map_or(0, |(a, b)| line_len(a, b))
            }
            Pattern::Raster { sweeps, .. } => sweeps * 2,
        };
        Self {
            pattern,
            next: 0,
            len,
        }
    }

    /// Number of passes: rings plus the centring pass, sweeps, or 1 for a
    /// single straight pass.
    pub fn passes(&self) -> usize {
        match self.pattern {
            Pattern::Line { .. } => 1,
            Pattern::Spiral { rings, centre, .. } => rings + usize::from(centre.is_some()),
            Pattern::Raster { sweeps, .. } => sweeps,
        }
    }

    fn waypoint(&self, i: usize) -> Vec2 {
        match self.pattern {
            Pattern::Line { from, to } => {
                if i == 0 {
                    from
                } else {
                    to
                }
            }
            Pattern::Spiral {
                rect,
                step,
                rings,
                centre,
            } => {
                if i < rings * RING_POINTS {
                    ring_corner(&rect, (i / RING_POINTS) as f64 * step, i % RING_POINTS)
                } else {
                    match centre {
                        Some((_, b)) if i > rings * RING_POINTS => b,
                        Some((a, _)) => a,
                        None => rect.centroid(),
                    }
                }
            }
            Pattern::Raster {
                rect,
                step,
                sweeps,
                horizontal,
            } => {
                let sweep = i / 2;
                let reversed = sweep % 2 == 1;
                let at_end = (i % 2 == 1) != reversed;
                let (span, across) = if horizontal {
                    (rect.width, rect.height)
                } else {
                    (rect.height, rect.width)
                };
                let along = if at_end { span } else { 0.0 };
                let offset = sweep_offset(sweep, sweeps, across, step);
                if horizontal {
                    Vec2::new(rect.x + along, rect.y + offset)
                } else {
                    Vec2::new(rect.x + offset, rect.y + along)
                }
            }
        }
    }
}

impl Iterator for FillPath {
    type Item = Vec2;

    fn next(&mut self) -> Option<Vec2> {
        if self.next >= self.len {
            return None;
        }
        let p = self.waypoint(self.next);
        self.next += 1;
        Some(p)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for FillPath {}

fn line_len(from: Vec2, to: Vec2) -> usize {
    if Vec2::dist(from, to) <= MIN_SEGMENT {
        1
    } else {
        2
    }
}

/// Corner `k` of the ring inset by `inset`, counter-clockwise from the
/// minimum corner; corner 4 closes the ring.
fn ring_corner(rect: &Rect, inset: f64, k: usize) -> Vec2 {
    let lo = rect.min();
    let hi = rect.max();
    let (x0, y0, x1, y1) = (lo.x + inset, lo.y + inset, hi.x - inset, hi.y - inset);
    match k {
        1 => Vec2::new(x1, y0),
        2 => Vec2::new(x1, y1),
        3 => Vec2::new(x0, y1),
        _ => Vec2::new(x0, y0),
    }
}

/// Distance of sweep `i` from the near edge. Sweeps sit half a step in
/// from each edge; the last interval absorbs the remainder and is never
/// wider than `step`.
fn sweep_offset(i: usize, sweeps: usize, across: f64, step: f64) -> f64 {
    if sweeps <= 1 {
        across / 2.0
    } else if i + 1 >= sweeps {
        across - step / 2.0
    } else {
        step / 2.0 + i as f64 * step
    }
}

/// Rings needed for a spiral over a rectangle whose short side is `short`,
/// and whether a centring pass follows the last ring.
///
/// A ring whose short extent would not exceed [`min_ring_extent`] is
/// replaced by the centring pass, so every ring edge is longer than
/// [`MIN_SEGMENT`].
fn spiral_rings(short: f64, step: f64) -> (usize, bool) {
    let min_extent = min_ring_extent(step);
    let mut rings = 1;
    loop {
        let extent = short - 2.0 * (rings - 1) as f64 * step;
        if extent <= step {
            return (rings, false);
        }
        if extent - 2.0 * step <= min_extent {
            return (rings, true);
        }
        rings += 1;
    }
}

fn min_ring_extent(step: f64) -> f64 {
    (step * MIN_RING_FRACTION).max(MIN_SEGMENT)
}

/// Sweeps across `across`. The last interval is always longer than
/// [`MIN_SEGMENT`], and at most `step + MIN_SEGMENT`.
fn raster_sweeps(across: f64, step: f64) -> usize {
    let n = ((across - MIN_SEGMENT) / step).ceil();
    if n < 1.0 {
        1
    } else {
        n as usize
    }
}

/// Single pass along the centre line of the long axis, edge to edge.
fn centred_pass(rect: &Rect) -> Pattern {
    let c = rect.centroid();
    if rect.width >= rect.height {
        Pattern::Line {
            from: Vec2::new(rect.x, c.y),
            to: Vec2::new(rect.x + rect.width, c.y),
        }
    } else {
        Pattern::Line {
            from: Vec2::new(c.x, rect.y),
            to: Vec2::new(c.x, rect.y + rect.height),
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────

/// Build the fill for `rect`.
///
/// A rectangle narrower than the tool in either axis gets one centred pass
/// along its long axis regardless of mode.
pub fn fill_path(rect: &Rect, tool: &ToolParams, mode: FillMode) -> FillPath {
    let step = tool.step_over();
    if rect.short_side() < tool.diameter() {
        return FillPath::new(centred_pass(rect));
    }

    let pattern = match mode {
        FillMode::SpiralIn => {
            let (rings, has_centre) = spiral_rings(rect.short_side(), step);
            let centre = has_centre.then(|| {
                let c = rect.short_side() / 2.0;
                let lo = rect.min();
                let hi = rect.max();
                (Vec2::new(lo.x + c, lo.y + c), Vec2::new(hi.x - c, hi.y - c))
            });
            Pattern::Spiral {
                rect: *rect,
                step,
                rings,
                centre,
            }
        }
        FillMode::Raster(direction) => {
            let horizontal = direction.is_horizontal(rect);
            let across = if horizontal { rect.height } else { rect.width };
            Pattern::Raster {
                rect: *rect,
                step,
                sweeps: raster_sweeps(across, step),
                horizontal,
            }
        }
    };
    FillPath::new(pattern)
}
