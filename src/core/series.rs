use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::archive::{ArchiveFile, ArchiveOutcome};
use crate::core::collection::{BoundsSignal, StaleLevel};
use crate::core::windowing::y_range_within;
use crate::core::{Axis, AxisRange, Color, DataPoint, Extrema, LineId, LineType, Marker, SeriesStyle};
use crate::error::PlotResult;

/// One line's points, running extrema and display attributes.
///
/// All state sits behind a single lock so appenders, bounds computation,
/// the archive manager and the path builder can run on different threads.
/// Reads of the point list transparently reload spilled points first.
#[derive(Debug)]
pub struct Series {
    id: LineId,
    state: Mutex<SeriesState>,
}

#[derive(Debug)]
struct SeriesState {
    name: String,
    axis: Axis,
    style: SeriesStyle,
    visible: bool,
    points: Vec<DataPoint>,
    extrema: Extrema,
    archive: Option<ArchiveFile>,
    // `false` only while points live solely in `archive`.
    resident: bool,
    owner: Option<Arc<BoundsSignal>>,
}

impl SeriesState {
    fn ensure_resident(&mut self, id: LineId) -> PlotResult<()> {
        if self.resident {
            return Ok(());
        }
        if let Some(archive) = &self.archive {
            self.points = archive.read()?;
            debug!(line = %id, count = self.points.len(), "reloaded archived series");
        }
        self.resident = true;
        Ok(())
    }

    fn discard_archive(&mut self) {
        self.archive = None;
        self.resident = true;
    }

    fn signal(&self, level: StaleLevel) {
        if let Some(owner) = &self.owner {
            owner.raise(level);
        }
    }
}

/// Read-only view of a series' attributes, taken under its lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub id: LineId,
    pub name: String,
    pub axis: Axis,
    pub style: SeriesStyle,
    pub visible: bool,
    pub len: usize,
    pub archived: bool,
}

impl Series {
    #[must_use]
    pub fn new(id: LineId, name: impl Into<String>, axis: Axis, style: SeriesStyle) -> Self {
        Self {
            id,
            state: Mutex::new(SeriesState {
                name: name.into(),
                axis,
                style,
                visible: true,
                points: Vec::new(),
                extrema: Extrema::empty(),
                archive: None,
                resident: true,
                owner: None,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> LineId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.lock().name = name.into();
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.state.lock().axis
    }

    #[must_use]
    pub fn style(&self) -> SeriesStyle {
        self.state.lock().style
    }

    pub fn set_style(&self, style: SeriesStyle) {
        self.state.lock().style = style;
    }

    pub fn set_color(&self, color: Color) {
        self.state.lock().style.color = color;
    }

    pub fn set_marker(&self, marker: Marker) {
        self.state.lock().style.marker = marker;
    }

    pub fn set_line_type(&self, line_type: LineType) {
        self.state.lock().style.line_type = line_type;
    }

    pub fn set_in_legend(&self, in_legend: bool) {
        self.state.lock().style.in_legend = in_legend;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Flips visibility; returns `false` when the value was already set.
    pub fn set_visible(&self, visible: bool) -> bool {
        let mut state = self.state.lock();
        if state.visible == visible {
            return false;
        }
        state.visible = visible;
        state.signal(StaleLevel::Structural);
        true
    }

    /// Appends one sample and folds it into the running extrema.
    ///
    /// Samples with NaN/infinite coordinates are stored but never contribute
    /// to extrema, bounds or draw paths. Appending to an archived series
    /// reloads it first and invalidates the spilled copy.
    pub fn append(&self, x: f64, y: f64) -> PlotResult<()> {
        let mut state = self.state.lock();
        state.ensure_resident(self.id)?;
        let point = DataPoint::new(x, y);
        state.points.push(point);
        state.extrema.include(point);
        state.discard_archive();
        state.signal(StaleLevel::Appended);
        trace!(line = %self.id, count = state.points.len(), "append point");
        Ok(())
    }

    /// Appends a batch of samples under one lock acquisition.
    pub fn extend(&self, points: &[DataPoint]) -> PlotResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock();
        state.ensure_resident(self.id)?;
        state.points.extend_from_slice(points);
        for point in points {
            state.extrema.include(*point);
        }
        state.discard_archive();
        state.signal(StaleLevel::Appended);
        trace!(line = %self.id, count = state.points.len(), "extend points");
        Ok(())
    }

    /// Replaces the whole point list and recomputes extrema from scratch.
    ///
    /// Mismatched lengths are truncated to the shorter slice. Returns the
    /// number of points kept.
    pub fn replace_all(&self, xs: &[f64], ys: &[f64]) -> usize {
        let points: Vec<DataPoint> = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| DataPoint::new(x, y))
            .collect();
        let kept = points.len();
        if xs.len() != ys.len() {
            debug!(
                line = %self.id,
                xs = xs.len(),
                ys = ys.len(),
                kept,
                "truncated mismatched replacement arrays"
            );
        }

        let mut state = self.state.lock();
        state.extrema = Extrema::from_points(&points);
        state.points = points;
        state.discard_archive();
        state.signal(StaleLevel::Structural);
        kept
    }

    /// Drops all points, extrema and any archive file.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.points = Vec::new();
        state.extrema = Extrema::empty();
        state.discard_archive();
        state.signal(StaleLevel::Structural);
    }

    /// Point count, answered without touching disk.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        match (&state.archive, state.resident) {
            (Some(archive), false) => archive.point_count(),
            _ => state.points.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached extrema; valid whether or not the points are archived.
    #[must_use]
    pub fn extrema(&self) -> Extrema {
        self.state.lock().extrema
    }

    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.extrema().min_x
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.extrema().max_x
    }

    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.extrema().min_y
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.extrema().max_y
    }

    /// `true` while the points live only on disk.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        let state = self.state.lock();
        state.archive.is_some() && !state.resident
    }

    #[must_use]
    pub fn archive_path(&self) -> Option<PathBuf> {
        self.state
            .lock()
            .archive
            .as_ref()
            .map(|archive| archive.path().to_path_buf())
    }

    /// Reloads spilled points; a no-op when they are already in memory.
    pub fn ensure_loaded(&self) -> PlotResult<()> {
        self.state.lock().ensure_resident(self.id)
    }

    /// Runs `f` over the full point list, reloading it from disk if needed.
    pub fn with_points<T>(&self, f: impl FnOnce(&[DataPoint]) -> T) -> PlotResult<T> {
        let mut state = self.state.lock();
        state.ensure_resident(self.id)?;
        Ok(f(&state.points))
    }

    /// Copy of the full point list.
    pub fn points(&self) -> PlotResult<Vec<DataPoint>> {
        self.with_points(<[DataPoint]>::to_vec)
    }

    /// Min/max of y over samples whose x lies in `window` (inclusive).
    pub fn bounds_within(&self, window: AxisRange) -> PlotResult<Option<AxisRange>> {
        self.with_points(|points| y_range_within(points, window))
    }

    #[must_use]
    pub fn info(&self) -> SeriesInfo {
        let state = self.state.lock();
        let archived = state.archive.is_some() && !state.resident;
        SeriesInfo {
            id: self.id,
            name: state.name.clone(),
            axis: state.axis,
            style: state.style,
            visible: state.visible,
            len: match (&state.archive, archived) {
                (Some(archive), true) => archive.point_count(),
                _ => state.points.len(),
            },
            archived,
        }
    }

    pub(crate) fn spill(
        &self,
        threshold_points: usize,
        folder: Option<&Path>,
        include_visible: bool,
    ) -> PlotResult<ArchiveOutcome> {
        let mut state = self.state.lock();
        if state.archive.is_some() && !state.resident {
            return Ok(ArchiveOutcome::AlreadyArchived);
        }
        if state.visible && !include_visible {
            return Ok(ArchiveOutcome::Visible);
        }
        if state.points.len() <= threshold_points {
            return Ok(ArchiveOutcome::BelowThreshold);
        }

        if state.archive.is_none() {
            let archive = ArchiveFile::write(&state.points, folder)?;
            state.archive = Some(archive);
        }
        state.points = Vec::new();
        state.resident = false;
        Ok(ArchiveOutcome::Archived)
    }

    pub(crate) fn attach(&self, signal: Arc<BoundsSignal>) {
        let mut state = self.state.lock();
        if let Some(previous) = state.owner.replace(Arc::clone(&signal)) {
            previous.raise(StaleLevel::Structural);
        }
        signal.raise(StaleLevel::Structural);
    }

    pub(crate) fn detach(&self) {
        let mut state = self.state.lock();
        if let Some(owner) = state.owner.take() {
            owner.raise(StaleLevel::Structural);
        }
    }

    pub(crate) fn set_axis(&self, axis: Axis) {
        self.state.lock().axis = axis;
    }
}

