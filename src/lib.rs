//! stripchart: live time-series plotting pipeline.
//!
//! The crate keeps series storage, bounds computation and draw-path
//! decimation free of any UI toolkit. Hosts append points from any thread,
//! receive coalesced redraw requests, and hand the resulting `PlotFrame` to
//! their own `Renderer`.

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{LivePlot, LivePlotConfig, UpdateQueue};
pub use error::{PlotError, PlotResult};
