use crate::error::PlotResult;
use crate::render::{PlotFrame, Renderer};

/// No-op renderer used by tests and headless plots.
///
/// It still validates frame content so invalid styles or viewports surface
/// before a real backend is attached.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames_rendered: usize,
    pub last_drawing_count: usize,
    pub last_segment_count: usize,
    pub last_marker_count: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &PlotFrame) -> PlotResult<()> {
        frame.validate()?;
        self.frames_rendered += 1;
        self.last_drawing_count = frame.drawings.len();
        self.last_segment_count = frame.segment_count();
        self.last_marker_count = frame.marker_count();
        Ok(())
    }
}
