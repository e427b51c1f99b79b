use serde::Serialize;

use crate::core::{Axis, AxisRange, AxisTransform, Viewport};
use crate::error::{PlotError, PlotResult};
use crate::render::SeriesDrawing;

/// Bounds and pixel mapping of one range axis for a draw pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisFrame {
    pub axis: Axis,
    pub domain: AxisRange,
    pub range: AxisRange,
    pub x_scale: AxisTransform,
    pub y_scale: AxisTransform,
}

/// Backend-agnostic scene for one plot draw pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotFrame {
    pub viewport: Viewport,
    pub axes: Vec<AxisFrame>,
    pub drawings: Vec<SeriesDrawing>,
}

impl PlotFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            axes: Vec::new(),
            drawings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_axis(mut self, axis: AxisFrame) -> Self {
        self.axes.push(axis);
        self
    }

    #[must_use]
    pub fn with_drawing(mut self, drawing: SeriesDrawing) -> Self {
        self.drawings.push(drawing);
        self
    }

    #[must_use]
    pub fn axis(&self, axis: Axis) -> Option<&AxisFrame> {
        self.axes.iter().find(|frame| frame.axis == axis)
    }

    pub fn validate(&self) -> PlotResult<()> {
        self.viewport.validate()?;

        for drawing in &self.drawings {
            drawing.style.color.validate()?;
            drawing.style.marker.validate()?;
            if !drawing.style.line_width_px.is_finite() || drawing.style.line_width_px <= 0.0 {
                return Err(PlotError::InvalidData(format!(
                    "line {} width must be finite and > 0",
                    drawing.line
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.drawings.iter().map(|drawing| drawing.markers.len()).sum()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.drawings
            .iter()
            .filter_map(|drawing| drawing.path.as_ref())
            .map(|path| path.segment_count())
            .sum()
    }
}
