mod draw_path;
mod frame;
mod null_renderer;

pub use draw_path::{
    DecimatingPathBuilder, DrawPath, PathBuilderConfig, PathCommand, PixelMapping, SeriesDrawing,
};
pub use frame::{AxisFrame, PlotFrame};
pub use null_renderer::NullRenderer;

use crate::error::PlotResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized `PlotFrame` so drawing code stays
/// isolated from series storage and update scheduling.
pub trait Renderer {
    fn render(&mut self, frame: &PlotFrame) -> PlotResult<()>;
}
