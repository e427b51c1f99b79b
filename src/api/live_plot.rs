use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::{
    ArchiveManager, ArchiveOutcome, Axis, AxisRange, AxisScaleMode, AxisTransform, BoundsPolicy,
    Color, LineId, LineType, Marker, Palette, Series, SeriesCollection, SeriesInfo, SeriesStyle,
    Viewport, XValueTransform,
};
use crate::error::{PlotError, PlotResult};
use crate::render::{
    AxisFrame, DecimatingPathBuilder, PixelMapping, PlotFrame, Renderer, SeriesDrawing,
};

use super::plot_config::validate_strip_width;
use super::{DirtySet, LivePlotConfig, UpdateQueueHandle, UpdateTarget};

/// Lines covered by one coalesced redraw pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedrawRequest {
    pub lines: SmallVec<[LineId; 8]>,
    /// Set for explicit refreshes (mode or bound changes), which also reset
    /// incremental bounds.
    pub forced: bool,
}

/// Host callback invoked once per coalesced redraw pass.
///
/// Runs on whichever thread drove the update: the appending thread in
/// synchronous mode, the queue consumer in turbo mode.
pub trait RedrawHandler: Send + Sync {
    fn redraw(&self, plot: &LivePlot, request: &RedrawRequest);
}

impl<F> RedrawHandler for F
where
    F: Fn(&LivePlot, &RedrawRequest) + Send + Sync,
{
    fn redraw(&self, plot: &LivePlot, request: &RedrawRequest) {
        self(plot, request);
    }
}

#[derive(Debug, Clone, Copy)]
struct PlotSettings {
    turbo_mode: bool,
    strip_width: Option<f64>,
    pinned_domain: Option<AxisRange>,
    pinned_ranges: [Option<AxisRange>; 2],
    x_transform: XValueTransform,
    next_line: i32,
}

/// Thread-safe facade over both axis collections, the dirty set and the
/// redraw plumbing of one live plot.
///
/// Always handed out as `Arc<LivePlot>` so queued update tokens can refer
/// back to it weakly.
pub struct LivePlot {
    self_ref: Weak<LivePlot>,
    collections: [SeriesCollection; 2],
    settings: RwLock<PlotSettings>,
    dirty: DirtySet,
    recent: Mutex<Vec<LineId>>,
    archive: ArchiveManager,
    path_builder: DecimatingPathBuilder,
    palette: Palette,
    secondary_axis_enabled: bool,
    domain_scale: AxisScaleMode,
    range_scale: AxisScaleMode,
    queue: RwLock<Option<UpdateQueueHandle>>,
    handlers: RwLock<Vec<Arc<dyn RedrawHandler>>>,
    update_passes: AtomicU64,
}

impl std::fmt::Debug for LivePlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePlot")
            .field("settings", &*self.settings.read())
            .field("primary", &self.collections[0].ids())
            .field("secondary", &self.collections[1].ids())
            .field("update_passes", &self.update_count())
            .finish_non_exhaustive()
    }
}

impl LivePlot {
    pub fn new(config: LivePlotConfig) -> PlotResult<Arc<Self>> {
        let config = config.validate()?;
        let primary = SeriesCollection::new(Axis::Primary);
        let secondary = SeriesCollection::new(Axis::Secondary);
        primary.set_x_transform(config.x_transform);
        secondary.set_x_transform(config.x_transform);

        Ok(Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            collections: [primary, secondary],
            settings: RwLock::new(PlotSettings {
                turbo_mode: config.turbo_mode,
                strip_width: config.strip_width,
                pinned_domain: None,
                pinned_ranges: [None, None],
                x_transform: config.x_transform,
                next_line: 0,
            }),
            dirty: DirtySet::new(),
            recent: Mutex::new(Vec::new()),
            archive: ArchiveManager::new(config.archive),
            path_builder: DecimatingPathBuilder::new(config.path_builder),
            palette: config.palette,
            secondary_axis_enabled: config.secondary_axis_enabled,
            domain_scale: config.domain_scale,
            range_scale: config.range_scale,
            queue: RwLock::new(None),
            handlers: RwLock::new(Vec::new()),
            update_passes: AtomicU64::new(0),
        }))
    }

    /// Snapshot of the current settings as a serializable config.
    #[must_use]
    pub fn current_config(&self) -> LivePlotConfig {
        let settings = *self.settings.read();
        LivePlotConfig {
            turbo_mode: settings.turbo_mode,
            strip_width: settings.strip_width,
            archive: self.archive.config().clone(),
            path_builder: self.path_builder.config(),
            x_transform: settings.x_transform,
            palette: self.palette.clone(),
            secondary_axis_enabled: self.secondary_axis_enabled,
            domain_scale: self.domain_scale,
            range_scale: self.range_scale,
        }
    }

    #[must_use]
    pub fn collection(&self, axis: Axis) -> &SeriesCollection {
        &self.collections[axis.index()]
    }

    #[must_use]
    pub fn archive_manager(&self) -> &ArchiveManager {
        &self.archive
    }

    #[must_use]
    pub fn dirty_set(&self) -> &DirtySet {
        &self.dirty
    }

    /// Creates (or replaces) a line on `axis`.
    ///
    /// Lines land on the primary axis when the secondary axis is disabled.
    /// Pending dirty lines are discarded.
    pub fn initialize_line(&self, id: LineId, name: impl Into<String>, axis: Axis) -> Arc<Series> {
        let axis = if self.secondary_axis_enabled {
            axis
        } else {
            Axis::Primary
        };
        for collection in &self.collections {
            if let Some(previous) = collection.remove(id) {
                previous.clear();
            }
        }

        let style = SeriesStyle::with_color(self.palette.color_for(id));
        let series = Arc::new(Series::new(id, name, axis, style));
        self.collection(axis).insert(Arc::clone(&series));
        {
            let mut settings = self.settings.write();
            settings.next_line = settings.next_line.max(id.raw().saturating_add(1));
        }
        self.dirty.clear();
        self.recent.lock().clear();
        debug!(line = %id, ?axis, "initialized line");
        series
    }

    #[must_use]
    pub fn series(&self, id: LineId) -> Option<Arc<Series>> {
        self.collections
            .iter()
            .find_map(|collection| collection.get(id))
    }

    fn require(&self, id: LineId) -> PlotResult<Arc<Series>> {
        self.series(id).ok_or(PlotError::UnknownLine(id))
    }

    /// Line numbers across both axes, primary first.
    #[must_use]
    pub fn line_ids(&self) -> Vec<LineId> {
        self.collections
            .iter()
            .flat_map(SeriesCollection::ids)
            .collect()
    }

    #[must_use]
    pub fn lines_info(&self) -> Vec<SeriesInfo> {
        self.collections
            .iter()
            .flat_map(SeriesCollection::series)
            .map(|series| series.info())
            .collect()
    }

    /// Highest line number ever initialized plus one.
    #[must_use]
    pub fn next_available_line(&self) -> LineId {
        LineId::new(self.settings.read().next_line)
    }

    /// Appends one point and marks the line dirty.
    ///
    /// In turbo mode the update is posted to the attached queue. Otherwise a
    /// redraw pass runs synchronously when `notify` is set; batched appends
    /// pass `notify = false` until their last point.
    pub fn append_point(&self, id: LineId, x: f64, y: f64, notify: bool) -> PlotResult<()> {
        let series = self.require(id)?;
        series.append(x, y)?;
        self.dirty.insert(id);
        self.data_changed(notify)
    }

    /// Appends with notification whenever the plot is not in turbo mode.
    pub fn add_point(&self, id: LineId, x: f64, y: f64) -> PlotResult<()> {
        let notify = !self.turbo_mode();
        self.append_point(id, x, y, notify)
    }

    /// Replaces a line's points; mismatched slices are truncated to the shorter.
    pub fn replace_points(&self, id: LineId, xs: &[f64], ys: &[f64]) -> PlotResult<usize> {
        let series = self.require(id)?;
        let kept = series.replace_all(xs, ys);
        self.dirty.insert(id);
        self.data_changed(true)?;
        Ok(kept)
    }

    fn data_changed(&self, notify: bool) -> PlotResult<()> {
        if self.turbo_mode() {
            return self.post_update();
        }
        if notify {
            self.on_update(false);
        }
        Ok(())
    }

    fn post_update(&self) -> PlotResult<()> {
        let handle = self.queue.read().clone();
        let Some(handle) = handle else {
            return Ok(());
        };
        let target: Weak<dyn UpdateTarget> = self.self_ref.clone();
        handle.post(target)
    }

    /// Shows or hides a line; hiding a large line spills it to disk.
    pub fn set_visibility(&self, id: LineId, visible: bool) -> PlotResult<bool> {
        let series = self.require(id)?;
        let changed = series.set_visible(visible);
        if !visible {
            let outcome = self.archive.maybe_archive(&series);
            trace!(line = %id, ?outcome, "hidden line archive check");
        }
        if changed {
            self.on_update(true);
        }
        Ok(changed)
    }

    pub fn set_color(&self, id: LineId, color: Color) -> PlotResult<()> {
        self.require(id)?.set_color(color.validate()?);
        Ok(())
    }

    pub fn set_marker(&self, id: LineId, marker: Marker) -> PlotResult<()> {
        self.require(id)?.set_marker(marker.validate()?);
        Ok(())
    }

    pub fn set_line_type(&self, id: LineId, line_type: LineType) -> PlotResult<()> {
        self.require(id)?.set_line_type(line_type);
        Ok(())
    }

    pub fn set_all_line_types(&self, line_type: LineType) {
        for collection in &self.collections {
            for series in collection.series() {
                series.set_line_type(line_type);
            }
        }
    }

    pub fn set_line_name(&self, id: LineId, name: impl Into<String>) -> PlotResult<()> {
        self.require(id)?.set_name(name);
        Ok(())
    }

    pub fn set_in_legend(&self, id: LineId, in_legend: bool) -> PlotResult<()> {
        self.require(id)?.set_in_legend(in_legend);
        Ok(())
    }

    /// Removes a line and its data; returns `false` for unknown lines.
    pub fn delete_line(&self, id: LineId) -> bool {
        let removed = self
            .collections
            .iter()
            .find_map(|collection| collection.remove(id));
        let Some(series) = removed else {
            return false;
        };
        series.clear();
        self.dirty.remove(id);
        self.recent.lock().retain(|line| *line != id);
        debug!(line = %id, "deleted line");
        self.on_update(true);
        true
    }

    /// Removes every line and resets line numbering.
    pub fn delete_all_lines(&self) {
        for collection in &self.collections {
            for series in collection.clear() {
                series.clear();
            }
        }
        self.dirty.clear();
        self.recent.lock().clear();
        self.settings.write().next_line = 0;
        debug!("deleted all lines");
        self.on_update(true);
    }

    fn policy(&self, axis: Axis) -> BoundsPolicy {
        let settings = self.settings.read();
        if !settings.turbo_mode {
            return BoundsPolicy::FullScan;
        }
        let pinned_range = settings.pinned_ranges[axis.index()];
        match (settings.pinned_domain, settings.strip_width) {
            (None, Some(width)) => BoundsPolicy::StripWindow {
                width,
                pinned_range,
            },
            (pinned_domain, _) => BoundsPolicy::Turbo {
                pinned_domain,
                pinned_range,
            },
        }
    }

    /// Lines drained by the last redraw pass plus those pending since.
    fn bounds_lines(&self) -> Vec<LineId> {
        let mut lines: IndexSet<LineId> = self.recent.lock().iter().copied().collect();
        lines.extend(self.dirty.snapshot());
        lines.into_iter().collect()
    }

    /// Current domain bounds of `axis` in transformed x units; `None` without data.
    pub fn domain_bounds(&self, axis: Axis) -> PlotResult<Option<AxisRange>> {
        self.collection(axis)
            .domain_bounds(self.policy(axis), &self.bounds_lines())
    }

    /// Current range bounds of `axis`; `None` without data.
    pub fn range_bounds(&self, axis: Axis) -> PlotResult<Option<AxisRange>> {
        self.collection(axis)
            .range_bounds(self.policy(axis), &self.bounds_lines())
    }

    /// Pins (or releases) the domain of both axes. Pinning clears the strip width.
    pub fn set_domain_bounds(&self, bounds: Option<AxisRange>) -> PlotResult<()> {
        let bounds = bounds.map(validate_pinned).transpose()?;
        {
            let mut settings = self.settings.write();
            settings.pinned_domain = bounds;
            settings.strip_width = None;
        }
        self.on_update(true);
        Ok(())
    }

    pub fn set_range_bounds(&self, axis: Axis, bounds: Option<AxisRange>) -> PlotResult<()> {
        let bounds = bounds.map(validate_pinned).transpose()?;
        self.settings.write().pinned_ranges[axis.index()] = bounds;
        self.on_update(true);
        Ok(())
    }

    #[must_use]
    pub fn pinned_domain(&self) -> Option<AxisRange> {
        self.settings.read().pinned_domain
    }

    #[must_use]
    pub fn pinned_range(&self, axis: Axis) -> Option<AxisRange> {
        self.settings.read().pinned_ranges[axis.index()]
    }

    #[must_use]
    pub fn turbo_mode(&self) -> bool {
        self.settings.read().turbo_mode
    }

    /// Switches turbo mode; leaving it also drops the strip width.
    pub fn set_turbo_mode(&self, turbo_mode: bool) {
        {
            let mut settings = self.settings.write();
            if settings.turbo_mode == turbo_mode {
                return;
            }
            settings.turbo_mode = turbo_mode;
            if !turbo_mode {
                settings.strip_width = None;
            }
        }
        debug!(turbo_mode, "turbo mode changed");
        self.on_update(true);
    }

    #[must_use]
    pub fn strip_width(&self) -> Option<f64> {
        self.settings.read().strip_width
    }

    pub fn set_strip_width(&self, width: Option<f64>) -> PlotResult<()> {
        let width = width.map(validate_strip_width).transpose()?;
        self.settings.write().strip_width = width;
        self.on_update(true);
        Ok(())
    }

    #[must_use]
    pub fn x_value_transform(&self) -> XValueTransform {
        self.settings.read().x_transform
    }

    pub fn set_x_value_transform(&self, transform: XValueTransform) -> PlotResult<()> {
        let transform = transform.validate()?;
        self.settings.write().x_transform = transform;
        for collection in &self.collections {
            collection.set_x_transform(transform);
        }
        self.on_update(true);
        Ok(())
    }

    /// Copies the pinned domain and strip width of `other`.
    pub fn copy_settings(&self, other: &LivePlot) {
        let (pinned_domain, strip_width) = {
            let source = other.settings.read();
            (source.pinned_domain, source.strip_width)
        };
        {
            let mut settings = self.settings.write();
            settings.pinned_domain = pinned_domain;
            settings.strip_width = strip_width;
        }
        self.on_update(true);
    }

    /// Routes turbo-mode updates through `handle`; replaces any previous queue.
    pub fn attach_update_queue(&self, handle: UpdateQueueHandle) {
        *self.queue.write() = Some(handle);
    }

    pub fn detach_update_queue(&self) -> Option<UpdateQueueHandle> {
        self.queue.write().take()
    }

    pub fn add_redraw_handler(&self, handler: Arc<dyn RedrawHandler>) {
        self.handlers.write().push(handler);
    }

    /// Closure form of [`LivePlot::add_redraw_handler`].
    pub fn on_redraw<F>(&self, handler: F)
    where
        F: Fn(&LivePlot, &RedrawRequest) + Send + Sync + 'static,
    {
        self.add_redraw_handler(Arc::new(handler));
    }

    pub fn clear_redraw_handlers(&self) {
        self.handlers.write().clear();
    }

    /// Redraw passes that reached the handlers.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_passes.load(Ordering::Acquire)
    }

    /// Drains the dirty set and runs one redraw pass.
    ///
    /// Without `force`, an empty dirty set makes this a no-op returning `None`.
    /// A forced pass resets incremental bounds and always reaches the handlers.
    pub fn on_update(&self, force: bool) -> Option<RedrawRequest> {
        let lines = self.dirty.drain();
        if lines.is_empty() && !force {
            return None;
        }
        if force {
            for collection in &self.collections {
                collection.reset_bounds();
            }
        }
        if !lines.is_empty() {
            *self.recent.lock() = lines.clone();
        }

        let request = RedrawRequest {
            lines: lines.into_iter().collect(),
            forced: force,
        };
        let handlers: Vec<Arc<dyn RedrawHandler>> = self.handlers.read().clone();
        for handler in &handlers {
            handler.redraw(self, &request);
        }
        self.update_passes.fetch_add(1, Ordering::AcqRel);
        trace!(lines = request.lines.len(), forced = force, "redraw pass");
        Some(request)
    }

    /// Spills lines to disk: every line over the threshold when `all`,
    /// otherwise only hidden ones. Returns how many lines were archived.
    pub fn archive(&self, all: bool, folder: Option<&Path>) -> usize {
        let folder = folder.or(self.archive.config().folder.as_deref());
        let mut archived = 0;
        for collection in &self.collections {
            for series in collection.series() {
                if !all && series.is_visible() {
                    continue;
                }
                if self.archive.archive_in(&series, folder, all) == ArchiveOutcome::Archived {
                    archived += 1;
                }
            }
        }
        debug!(archived, all, "archive pass finished");
        archived
    }

    /// Reloads every archived line into memory.
    pub fn unarchive(&self) -> PlotResult<()> {
        for collection in &self.collections {
            for series in collection.series() {
                self.archive.ensure_loaded(&series)?;
            }
        }
        debug!("unarchived all lines");
        Ok(())
    }

    fn axis_frame(&self, axis: Axis, viewport: Viewport) -> PlotResult<Option<AxisFrame>> {
        let (Some(domain), Some(range)) = (self.domain_bounds(axis)?, self.range_bounds(axis)?)
        else {
            return Ok(None);
        };
        Ok(Some(AxisFrame {
            axis,
            domain,
            range,
            x_scale: AxisTransform::horizontal(self.domain_scale, domain, viewport)?,
            y_scale: AxisTransform::vertical(self.range_scale, range, viewport)?,
        }))
    }

    fn drawing_for(
        &self,
        series: &Series,
        frame: &AxisFrame,
        viewport: Viewport,
    ) -> PlotResult<SeriesDrawing> {
        self.path_builder.build(
            series,
            PixelMapping {
                viewport,
                domain: frame.x_scale,
                range: frame.y_scale,
                x_transform: self.x_value_transform(),
            },
        )
    }

    /// Decimated drawing of one line; `None` while its axis has no bounds.
    pub fn build_draw_path(
        &self,
        id: LineId,
        viewport: Viewport,
    ) -> PlotResult<Option<SeriesDrawing>> {
        let viewport = viewport.validate()?;
        let series = self.require(id)?;
        let Some(frame) = self.axis_frame(series.axis(), viewport)? else {
            return Ok(None);
        };
        self.drawing_for(&series, &frame, viewport).map(Some)
    }

    /// Builds a frame of every visible line and hands it to `renderer`.
    pub fn render_frame<R: Renderer + ?Sized>(
        &self,
        viewport: Viewport,
        renderer: &mut R,
    ) -> PlotResult<PlotFrame> {
        let viewport = viewport.validate()?;
        let mut frame = PlotFrame::new(viewport);
        for collection in &self.collections {
            let Some(axis_frame) = self.axis_frame(collection.axis(), viewport)? else {
                continue;
            };
            for series in collection.series() {
                if series.is_visible() {
                    frame
                        .drawings
                        .push(self.drawing_for(&series, &axis_frame, viewport)?);
                }
            }
            frame.axes.push(axis_frame);
        }
        renderer.render(&frame)?;
        Ok(frame)
    }
}

impl UpdateTarget for LivePlot {
    fn process_update(&self) -> PlotResult<()> {
        self.on_update(false);
        Ok(())
    }
}

fn validate_pinned(bounds: AxisRange) -> PlotResult<AxisRange> {
    let bounds = AxisRange::new(bounds.lower, bounds.upper)?;
    if bounds.is_degenerate() {
        return Err(PlotError::InvalidData(
            "pinned bounds must have non-zero length".to_owned(),
        ));
    }
    Ok(bounds)
}
