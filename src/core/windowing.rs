use crate::core::{AxisRange, DataPoint};

/// Min/max of y over samples whose x lies in `window` (inclusive).
///
/// Samples without data are skipped. Returns `None` when nothing falls in the
/// window.
#[must_use]
pub fn y_range_within(points: &[DataPoint], window: AxisRange) -> Option<AxisRange> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for point in points {
        if point.has_data() && window.contains(point.x) {
            min = min.min(point.y);
            max = max.max(point.y);
        }
    }

    (min <= max).then_some(AxisRange {
        lower: min,
        upper: max,
    })
}
