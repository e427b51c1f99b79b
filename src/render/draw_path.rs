use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{
    AxisTransform, DataPoint, LineId, PixelPoint, Series, SeriesStyle, Viewport, XValueTransform,
};
use crate::error::{PlotError, PlotResult};

// Keeps rounded coordinates far from i32 overflow in downstream geometry.
const PIXEL_LIMIT: f64 = (1_i64 << 24) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathBuilderConfig {
    /// Markers are dropped for a series whose `points / viewport width` exceeds this.
    #[serde(default = "default_marker_density_threshold")]
    pub marker_density_threshold: f64,
}

impl Default for PathBuilderConfig {
    fn default() -> Self {
        Self {
            marker_density_threshold: default_marker_density_threshold(),
        }
    }
}

impl PathBuilderConfig {
    #[must_use]
    pub fn with_marker_density_threshold(mut self, threshold: f64) -> Self {
        self.marker_density_threshold = threshold;
        self
    }

    pub fn validate(self) -> PlotResult<Self> {
        if !self.marker_density_threshold.is_finite() || self.marker_density_threshold < 0.0 {
            return Err(PlotError::InvalidData(
                "marker density threshold must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

fn default_marker_density_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(PixelPoint),
    LineTo(PixelPoint),
}

impl PathCommand {
    #[must_use]
    pub const fn point(self) -> PixelPoint {
        match self {
            Self::MoveTo(point) | Self::LineTo(point) => point,
        }
    }
}

/// Pixel-space polyline made of pen-up/pen-down commands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawPath {
    commands: Vec<PathCommand>,
}

impl DrawPath {
    #[must_use]
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn points(&self) -> impl Iterator<Item = PixelPoint> + '_ {
        self.commands.iter().map(|command| command.point())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of drawn segments (`LineTo` commands).
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, PathCommand::LineTo(_)))
            .count()
    }
}

/// Decimated render view of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDrawing {
    pub line: LineId,
    pub style: SeriesStyle,
    pub path: Option<DrawPath>,
    pub markers: Vec<PixelPoint>,
    pub markers_suppressed: bool,
}

/// Pixel mapping shared by every point of one build pass.
#[derive(Debug, Clone, Copy)]
pub struct PixelMapping {
    pub viewport: Viewport,
    pub domain: AxisTransform,
    pub range: AxisTransform,
    pub x_transform: XValueTransform,
}

impl PixelMapping {
    /// Rounded pixel position, or `None` when the sample cannot be placed.
    #[must_use]
    pub fn project(&self, point: DataPoint) -> Option<PixelPoint> {
        if !point.has_data() {
            return None;
        }
        let x = self.domain.value_to_pixel(self.x_transform.apply(point.x))?;
        let y = self.range.value_to_pixel(point.y)?;
        Some(PixelPoint::new(to_pixel(x), to_pixel(y)))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_pixel(value: f64) -> i32 {
    value.round().clamp(-PIXEL_LIMIT, PIXEL_LIMIT) as i32
}

/// Turns series points into a minimal on-screen path plus marker positions.
///
/// Off-screen runs are culled, except the endpoints of segments that cross
/// the viewport edge. While the pen is down, samples that land on the
/// previously emitted pixel are collapsed. Samples without data break the
/// path; the first sample after a break is always emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimatingPathBuilder {
    config: PathBuilderConfig,
}

impl DecimatingPathBuilder {
    #[must_use]
    pub fn new(config: PathBuilderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> PathBuilderConfig {
        self.config
    }

    /// Builds the drawing for `series`, reloading archived points if needed.
    pub fn build(&self, series: &Series, mapping: PixelMapping) -> PlotResult<SeriesDrawing> {
        mapping.viewport.validate()?;
        let style = series.style();
        let drawing = series.with_points(|points| self.build_points(points, style, mapping))?;
        trace!(
            line = %series.id(),
            commands = drawing.path.as_ref().map_or(0, DrawPath::len),
            markers = drawing.markers.len(),
            "built draw path"
        );
        Ok(SeriesDrawing {
            line: series.id(),
            ..drawing
        })
    }

    /// Point-slice form of [`DecimatingPathBuilder::build`]; the returned
    /// drawing carries a placeholder line id.
    #[must_use]
    pub fn build_points(
        &self,
        points: &[DataPoint],
        style: SeriesStyle,
        mapping: PixelMapping,
    ) -> SeriesDrawing {
        let markers_suppressed = self.markers_suppressed(points.len(), mapping.viewport);
        let want_markers = style.line_type.draws_markers() && !markers_suppressed;
        let (commands, markers) = decimate(points, mapping, want_markers);

        let path = (style.line_type.draws_line() && !commands.is_empty())
            .then(|| DrawPath { commands });
        SeriesDrawing {
            line: LineId::new(0),
            style,
            path,
            markers,
            markers_suppressed,
        }
    }

    fn markers_suppressed(&self, point_count: usize, viewport: Viewport) -> bool {
        if viewport.width <= 0 {
            return true;
        }
        #[allow(clippy::cast_precision_loss)]
        let density = point_count as f64 / f64::from(viewport.width);
        density > self.config.marker_density_threshold
    }
}

fn decimate(
    points: &[DataPoint],
    mapping: PixelMapping,
    want_markers: bool,
) -> (Vec<PathCommand>, Vec<PixelPoint>) {
    let viewport = mapping.viewport;
    let mut commands = Vec::new();
    let mut markers = Vec::new();

    let mut last_emitted: Option<PixelPoint> = None;
    let mut pen_down = false;
    let mut previous_on_screen = false;

    let mut projected = points
        .iter()
        .map(|point| mapping.project(*point))
        .peekable();

    while let Some(current) = projected.next() {
        let next = projected.peek().copied().flatten();
        match current {
            None => {
                pen_down = false;
                previous_on_screen = false;
            }
            Some(pixel) => {
                let on_screen = viewport.contains(pixel);
                let next_on_screen = next.is_some_and(|next| viewport.contains(next));
                if on_screen || previous_on_screen || next_on_screen {
                    if !(pen_down && last_emitted == Some(pixel)) {
                        commands.push(if pen_down {
                            PathCommand::LineTo(pixel)
                        } else {
                            PathCommand::MoveTo(pixel)
                        });
                        pen_down = true;
                        last_emitted = Some(pixel);
                        if on_screen && want_markers {
                            markers.push(pixel);
                        }
                    }
                } else {
                    pen_down = false;
                }
                previous_on_screen = on_screen;
            }
        }
    }

    (commands, markers)
}
