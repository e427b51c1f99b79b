use serde::{Deserialize, Serialize};

use crate::core::types::{AxisRange, Viewport};
use crate::error::{PlotError, PlotResult};

/// Mapping mode used by an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AxisScaleMode {
    /// Uniform spacing in raw data units.
    #[default]
    Linear,
    /// Uniform spacing in natural-log units (values must be > 0).
    Log,
}

/// Data-to-pixel mapping for one axis.
///
/// The mapping is stored as `pixel = t(value) * slope + intercept` where `t` is
/// the identity for linear axes and `ln` for log axes, so the per-point cost on
/// a linear axis is one multiply-add.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTransform {
    mode: AxisScaleMode,
    domain: AxisRange,
    slope: f64,
    intercept: f64,
}

impl AxisTransform {
    /// Maps `domain.lower` to `pixel_start` and `domain.upper` to `pixel_end`.
    pub fn new(
        mode: AxisScaleMode,
        domain: AxisRange,
        pixel_start: f64,
        pixel_end: f64,
    ) -> PlotResult<Self> {
        if !pixel_start.is_finite() || !pixel_end.is_finite() || pixel_start == pixel_end {
            return Err(PlotError::InvalidData(
                "axis pixel span must be finite and non-zero".to_owned(),
            ));
        }
        let (lower, upper) = match mode {
            AxisScaleMode::Linear => (domain.lower, domain.upper),
            AxisScaleMode::Log => {
                if domain.lower <= 0.0 {
                    return Err(PlotError::InvalidData(
                        "log axis domain must be strictly positive".to_owned(),
                    ));
                }
                (domain.lower.ln(), domain.upper.ln())
            }
        };
        if !lower.is_finite() || !upper.is_finite() || lower == upper {
            return Err(PlotError::InvalidData(
                "axis domain must be finite and non-zero".to_owned(),
            ));
        }

        let slope = (pixel_end - pixel_start) / (upper - lower);
        Ok(Self {
            mode,
            domain,
            slope,
            intercept: pixel_start - lower * slope,
        })
    }

    /// Domain axis: lower bound on the left edge, upper bound on the right edge.
    pub fn horizontal(
        mode: AxisScaleMode,
        domain: AxisRange,
        viewport: Viewport,
    ) -> PlotResult<Self> {
        let viewport = viewport.validate()?;
        Self::new(
            mode,
            domain,
            f64::from(viewport.left),
            f64::from(viewport.right()),
        )
    }

    /// Range axis: lower bound on the bottom edge, upper bound on the top edge.
    pub fn vertical(mode: AxisScaleMode, domain: AxisRange, viewport: Viewport) -> PlotResult<Self> {
        let viewport = viewport.validate()?;
        Self::new(
            mode,
            domain,
            f64::from(viewport.bottom()),
            f64::from(viewport.top),
        )
    }

    #[must_use]
    pub fn mode(self) -> AxisScaleMode {
        self.mode
    }

    #[must_use]
    pub fn domain(self) -> AxisRange {
        self.domain
    }

    #[must_use]
    pub fn coefficients(self) -> (f64, f64) {
        (self.slope, self.intercept)
    }

    /// Returns `None` for values the axis cannot place (non-finite, or <= 0 on a log axis).
    #[must_use]
    pub fn value_to_pixel(self, value: f64) -> Option<f64> {
        let transformed = match self.mode {
            AxisScaleMode::Linear => value,
            AxisScaleMode::Log => {
                if value <= 0.0 {
                    return None;
                }
                value.ln()
            }
        };
        let pixel = transformed.mul_add(self.slope, self.intercept);
        pixel.is_finite().then_some(pixel)
    }

    #[must_use]
    pub fn pixel_to_value(self, pixel: f64) -> Option<f64> {
        if !pixel.is_finite() {
            return None;
        }
        let transformed = (pixel - self.intercept) / self.slope;
        let value = match self.mode {
            AxisScaleMode::Linear => transformed,
            AxisScaleMode::Log => transformed.exp(),
        };
        value.is_finite().then_some(value)
    }
}

/// Linear re-expression of raw x values, `x' = scale * x + offset`.
///
/// Domain bounds and strip widths are expressed in transformed units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XValueTransform {
    pub scale: f64,
    pub offset: f64,
}

impl Default for XValueTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl XValueTransform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn new(scale: f64, offset: f64) -> PlotResult<Self> {
        Self { scale, offset }.validate()
    }

    pub fn validate(self) -> PlotResult<Self> {
        if !self.scale.is_finite() || self.scale == 0.0 || !self.offset.is_finite() {
            return Err(PlotError::InvalidData(
                "x transform scale must be finite and non-zero, offset finite".to_owned(),
            ));
        }
        Ok(self)
    }

    #[must_use]
    pub fn is_identity(self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if self.is_identity() {
            return x;
        }
        x.mul_add(self.scale, self.offset)
    }

    #[must_use]
    pub fn invert(self, transformed: f64) -> f64 {
        if self.is_identity() {
            return transformed;
        }
        (transformed - self.offset) / self.scale
    }

    #[must_use]
    pub fn apply_range(self, range: AxisRange) -> AxisRange {
        AxisRange::spanning(self.apply(range.lower), self.apply(range.upper))
    }

    #[must_use]
    pub fn invert_range(self, range: AxisRange) -> AxisRange {
        AxisRange::spanning(self.invert(range.lower), self.invert(range.upper))
    }
}
