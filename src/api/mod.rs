mod dirty_set;
mod live_plot;
mod plot_config;
mod update_queue;

pub use dirty_set::DirtySet;
pub use live_plot::{LivePlot, RedrawHandler, RedrawRequest};
pub use plot_config::LivePlotConfig;
pub use update_queue::{DEFAULT_QUEUE_CAPACITY, UpdateQueue, UpdateQueueHandle, UpdateTarget};
