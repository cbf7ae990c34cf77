/// Cutting tool definition.
///
/// Only the two numbers that drive the fill matter here: the tool diameter
/// and the fraction of it shared by adjacent passes.
use serde::Serialize;

use crate::error::{CutoutError, Result};

/// Validated tool parameters. Construction fails rather than allowing a
/// step-over that would never advance across the material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolParams {
    diameter: f64,
    overlap: f64,
}

impl ToolParams {
    pub fn new(diameter: f64, overlap: f64) -> Result<Self> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(CutoutError::InvalidTool { diameter });
        }
        if !overlap.is_finite() || !(0.0..1.0).contains(&overlap) {
            return Err(CutoutError::InvalidOverlap { overlap });
        }
        Ok(Self { diameter, overlap })
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Lateral distance between adjacent passes. Always positive.
    pub fn step_over(&self) -> f64 {
        self.diameter * (1.0 - self.overlap)
    }
}

impl Default for ToolParams {
    fn default() -> Self {
        // 0.015in V-bit, 15% overlap
        Self {
            diameter: 0.015,
            overlap: 0.15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tool_default() {
        let tool = ToolParams::default();
        assert_relative_eq!(tool.diameter(), 0.015);
        assert_relative_eq!(tool.step_over(), 0.01275, epsilon = 1e-12);
    }

    #[test]
    fn test_step_over_no_overlap() {
        let tool = ToolParams::new(0.1, 0.0).unwrap();
        assert_relative_eq!(tool.step_over(), 0.1);
        assert_relative_eq!(tool.radius(), 0.05);
    }

    #[test]
    fn test_rejects_non_positive_diameter() {
        assert!(matches!(
            ToolParams::new(0.0, 0.1),
            Err(CutoutError::InvalidTool { .. })
        ));
        assert!(matches!(
            ToolParams::new(-1.0, 0.1),
            Err(CutoutError::InvalidTool { .. })
        ));
        assert!(matches!(
            ToolParams::new(f64::NAN, 0.1),
            Err(CutoutError::InvalidTool { .. })
        ));
    }

    #[test]
    fn test_rejects_full_overlap() {
        let err = ToolParams::new(0.015, 1.0).unwrap_err();
        assert!(matches!(err, CutoutError::InvalidOverlap { .. }));
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_rejects_negative_overlap() {
        assert!(matches!(
            ToolParams::new(0.015, -0.2),
            Err(CutoutError::InvalidOverlap { .. })
        ));
    }
}
