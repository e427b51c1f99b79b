use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlotError, PlotResult};

/// Stable line number identifying one series for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(i32);

impl LineId {
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for LineId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Range axis a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Axis {
    #[default]
    Primary,
    Secondary,
}

impl Axis {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl DataPoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `false` for samples that mark "no data here" (NaN or infinite coordinates).
    #[must_use]
    pub fn has_data(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel-space rectangle a series is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn with_origin(mut self, left: i32, top: i32) -> Self {
        self.left = left;
        self.top = top;
        self
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn validate(self) -> PlotResult<Self> {
        if !self.is_valid() {
            return Err(PlotError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    #[must_use]
    pub const fn right(self) -> i32 {
        self.left.saturating_add(self.width)
    }

    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.top.saturating_add(self.height)
    }

    /// Inclusive containment test, edges count as on-screen.
    #[must_use]
    pub const fn contains(self, point: PixelPoint) -> bool {
        point.x >= self.left && point.x <= self.right() && point.y >= self.top && point.y <= self.bottom()
    }
}

/// Integer pixel coordinate produced by the path builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Closed interval `[lower, upper]` in data units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub lower: f64,
    pub upper: f64,
}

impl AxisRange {
    /// Relative padding applied to a degenerate range.
    pub const DEGENERATE_PAD_RATIO: f64 = 0.10;
    /// Absolute padding applied to a degenerate range sitting on zero.
    pub const DEGENERATE_PAD_ABSOLUTE: f64 = 0.1;

    pub fn new(lower: f64, upper: f64) -> PlotResult<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(PlotError::InvalidData(
                "axis range bounds must be finite".to_owned(),
            ));
        }
        if lower > upper {
            return Err(PlotError::InvalidData(format!(
                "axis range lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Builds a range from two values in either order.
    #[must_use]
    pub fn spanning(a: f64, b: f64) -> Self {
        if a <= b {
            Self { lower: a, upper: b }
        } else {
            Self { lower: b, upper: a }
        }
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.upper - self.lower
    }

    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    #[must_use]
    pub fn is_degenerate(self) -> bool {
        self.lower == self.upper
    }

    /// Widens a single-value range so an axis never collapses to zero length.
    ///
    /// The pad is 10% of the value's magnitude, or `0.1` when the value is zero.
    #[must_use]
    pub fn non_degenerate(self) -> Self {
        if !self.is_degenerate() {
            return self;
        }
        let magnitude = self.lower.abs();
        let pad = if magnitude == 0.0 {
            Self::DEGENERATE_PAD_ABSOLUTE
        } else {
            magnitude * Self::DEGENERATE_PAD_RATIO
        };
        Self {
            lower: self.lower - pad,
            upper: self.upper + pad,
        }
    }
}

/// Running min/max accumulator over x and y.
///
/// Empty accumulators hold `+inf`/`-inf` sentinels and report no range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for Extrema {
    fn default() -> Self {
        Self::empty()
    }
}

impl Extrema {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    #[must_use]
    pub fn from_points(points: &[DataPoint]) -> Self {
        let mut extrema = Self::empty();
        for point in points {
            extrema.include(*point);
        }
        extrema
    }

    /// Folds one sample in; samples without data are ignored.
    pub fn include(&mut self, point: DataPoint) {
        if !point.has_data() {
            return;
        }
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn merge(&mut self, other: Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.min_x > self.max_x
    }

    #[must_use]
    pub fn x_range(self) -> Option<AxisRange> {
        if self.is_empty() {
            return None;
        }
        Some(AxisRange {
            lower: self.min_x,
            upper: self.max_x,
        })
    }

    #[must_use]
    pub fn y_range(self) -> Option<AxisRange> {
        if self.min_y > self.max_y {
            return None;
        }
        Some(AxisRange {
            lower: self.min_y,
            upper: self.max_y,
        })
    }
}
