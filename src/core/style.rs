use serde::{Deserialize, Serialize};

use crate::core::LineId;
use crate::error::{PlotError, PlotResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    pub fn validate(self) -> PlotResult<Self> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PlotError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(self)
    }
}

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineType {
    LineOnly,
    PointsOnly,
    #[default]
    LineAndPoints,
}

impl LineType {
    /// Parses the names used by scan scripts: `lineonly`, `pointsonly`, `lineandpoints`.
    pub fn from_name(name: &str) -> PlotResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lineonly" => Ok(Self::LineOnly),
            "pointsonly" => Ok(Self::PointsOnly),
            "lineandpoints" => Ok(Self::LineAndPoints),
            other => Err(PlotError::InvalidData(format!("unknown line type `{other}`"))),
        }
    }

    #[must_use]
    pub const fn draws_line(self) -> bool {
        matches!(self, Self::LineOnly | Self::LineAndPoints)
    }

    #[must_use]
    pub const fn draws_markers(self) -> bool {
        matches!(self, Self::PointsOnly | Self::LineAndPoints)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MarkerShape {
    #[default]
    Square,
    Circle,
    Triangle,
    Diamond,
    Cross,
}

impl MarkerShape {
    /// Closed lookup from the numeric shape ids stored in saved plot settings.
    pub fn from_id(id: u8) -> PlotResult<Self> {
        match id {
            0 => Ok(Self::Square),
            1 => Ok(Self::Circle),
            2 => Ok(Self::Triangle),
            3 => Ok(Self::Diamond),
            4 => Ok(Self::Cross),
            other => Err(PlotError::InvalidData(format!("unknown marker shape id {other}"))),
        }
    }

    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Square => 0,
            Self::Circle => 1,
            Self::Triangle => 2,
            Self::Diamond => 3,
            Self::Cross => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub shape: MarkerShape,
    pub size_px: f64,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Square,
            size_px: 4.0,
        }
    }
}

impl Marker {
    pub fn validate(self) -> PlotResult<Self> {
        if !self.size_px.is_finite() || self.size_px <= 0.0 {
            return Err(PlotError::InvalidData(
                "marker size must be finite and > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

/// Display attributes of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub line_type: LineType,
    pub color: Color,
    pub marker: Marker,
    pub line_width_px: f64,
    pub in_legend: bool,
}

impl SeriesStyle {
    #[must_use]
    pub fn with_color(color: Color) -> Self {
        Self {
            line_type: LineType::default(),
            color,
            marker: Marker::default(),
            line_width_px: 1.0,
            in_legend: true,
        }
    }
}

/// Immutable color cycle handed to new series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::rgb(0.0, 0.0, 1.0),
                Color::rgb(1.0, 0.0, 0.0),
                Color::rgb(0.0, 0.6, 0.0),
                Color::rgb(1.0, 0.0, 1.0),
                Color::rgb(0.0, 0.75, 0.75),
                Color::rgb(1.0, 0.55, 0.0),
                Color::rgb(0.5, 0.0, 0.5),
                Color::rgb(0.4, 0.4, 0.4),
            ],
        }
    }
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> PlotResult<Self> {
        Self { colors }.validate()
    }

    pub fn validate(self) -> PlotResult<Self> {
        if self.colors.is_empty() {
            return Err(PlotError::InvalidData(
                "palette must contain at least one color".to_owned(),
            ));
        }
        for color in &self.colors {
            color.validate()?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Color assigned to a line number, cycling through the palette.
    #[must_use]
    pub fn color_for(&self, id: LineId) -> Color {
        if self.colors.is_empty() {
            return Color::rgb(0.0, 0.0, 0.0);
        }
        let index = id.raw().unsigned_abs() as usize % self.colors.len();
        self.colors[index]
    }
}
