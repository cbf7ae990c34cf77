//! Error types for the cutout pipeline.

use thiserror::Error;

/// Errors that can occur while turning SVG rectangles into G-code.
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Tool diameter is zero, negative or not a number.
    #[error("tool diameter must be positive, got {diameter}")]
    InvalidTool { diameter: f64 },

    /// Overlap fraction outside `[0, 1)`; the step-over would not advance.
    #[error("overlap fraction must be in [0, 1), got {overlap}")]
    InvalidOverlap { overlap: f64 },

    /// Spindle speed or a feed rate is not positive.
    #[error("{name} must be positive, got {value}")]
    InvalidMotion { name: &'static str, value: f64 },

    /// A rectangle with a non-positive extent.
    #[error("rectangle {index} has non-positive size {width} x {height}")]
    InvalidRectangle {
        index: usize,
        width: f64,
        height: f64,
    },

    /// Path data that does not outline an axis-aligned rectangle.
    #[error("path {index} is not an axis-aligned rectangle: {reason}")]
    NonRectangular { index: usize, reason: String },

    /// Test-pattern grid that cannot be laid out.
    #[error("invalid test pattern: {0}")]
    Pattern(String),

    /// Malformed SVG markup or path syntax.
    #[error("SVG parse error: {0}")]
    Svg(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Reading input or writing the program failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cutout operations.
pub type Result<T> = std::result::Result<T, CutoutError>;
