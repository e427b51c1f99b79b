pub mod archive;
pub mod collection;
pub mod scale;
pub mod series;
pub mod style;
pub mod types;
pub mod windowing;

pub use archive::{ArchiveConfig, ArchiveManager, ArchiveOutcome};
pub use collection::{BoundsPolicy, SeriesCollection};
pub use scale::{AxisScaleMode, AxisTransform, XValueTransform};
pub use series::{Series, SeriesInfo};
pub use style::{Color, LineType, Marker, MarkerShape, Palette, SeriesStyle};
pub use types::{Axis, AxisRange, DataPoint, Extrema, LineId, PixelPoint, Viewport};
pub use windowing::y_range_within;
