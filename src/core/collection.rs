use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[cfg(feature = "parallel-bounds")]
use rayon::prelude::*;

use crate::core::{Axis, AxisRange, Extrema, LineId, Series, XValueTransform};
use crate::error::PlotResult;

/// How stale a collection's cached bounds are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub(crate) enum StaleLevel {
    Clean = 0,
    /// Points were appended; incremental caches can merge.
    Appended = 1,
    /// Visibility, membership or whole point lists changed; rescan everything.
    Structural = 2,
}

impl StaleLevel {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Clean,
            1 => Self::Appended,
            _ => Self::Structural,
        }
    }
}

/// Lock-free staleness flag a series raises on its owning collection.
#[derive(Debug, Default)]
pub(crate) struct BoundsSignal {
    level: AtomicU8,
}

impl BoundsSignal {
    pub(crate) fn raise(&self, level: StaleLevel) {
        self.level.fetch_max(level as u8, Ordering::AcqRel);
    }

    fn take(&self) -> StaleLevel {
        StaleLevel::from_raw(self.level.swap(StaleLevel::Clean as u8, Ordering::AcqRel))
    }
}

/// Bounds policy selected by the plot mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundsPolicy {
    /// True extent of every visible series.
    FullScan,
    /// Most recent `width` domain units ending at the newest x of the dirty series.
    StripWindow {
        width: f64,
        pinned_range: Option<AxisRange>,
    },
    /// Pinned axes when set, otherwise dirty-only growth of the previous bounds.
    Turbo {
        pinned_domain: Option<AxisRange>,
        pinned_range: Option<AxisRange>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct AxisBounds {
    domain: Option<AxisRange>,
    range: Option<AxisRange>,
}

impl AxisBounds {
    fn from_extrema(extrema: Extrema, x_transform: XValueTransform) -> Self {
        Self {
            domain: extrema.x_range().map(|range| x_transform.apply_range(range)),
            range: extrema.y_range(),
        }
    }

    fn merge(&mut self, other: Self) {
        self.domain = merge_ranges(self.domain, other.domain);
        self.range = merge_ranges(self.range, other.range);
    }
}

#[derive(Debug, Default)]
struct BoundsCache {
    full: Option<AxisBounds>,
    turbo: Option<AxisBounds>,
    within_pinned: Option<(AxisRange, Option<AxisRange>)>,
}

impl BoundsCache {
    fn apply(&mut self, level: StaleLevel) {
        match level {
            StaleLevel::Clean => {}
            StaleLevel::Appended => {
                self.full = None;
                self.within_pinned = None;
            }
            StaleLevel::Structural => {
                self.full = None;
                self.turbo = None;
                self.within_pinned = None;
            }
        }
    }
}

/// Series bound to one range axis, plus that axis' cached view bounds.
///
/// Domain bounds are reported in x-transformed units; range bounds in raw y.
/// Every computed interval passes through [`AxisRange::non_degenerate`].
#[derive(Debug)]
pub struct SeriesCollection {
    axis: Axis,
    members: RwLock<IndexMap<LineId, Arc<Series>>>,
    signal: Arc<BoundsSignal>,
    x_transform: RwLock<XValueTransform>,
    cache: Mutex<BoundsCache>,
}

impl SeriesCollection {
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            members: RwLock::new(IndexMap::new()),
            signal: Arc::new(BoundsSignal::default()),
            x_transform: RwLock::new(XValueTransform::identity()),
            cache: Mutex::new(BoundsCache::default()),
        }
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Adds a series, replacing any member with the same line number.
    pub fn insert(&self, series: Arc<Series>) -> Option<Arc<Series>> {
        series.set_axis(self.axis);
        series.attach(Arc::clone(&self.signal));
        let previous = self.members.write().insert(series.id(), series);
        if let Some(previous) = &previous {
            previous.detach();
        }
        previous
    }

    pub fn remove(&self, id: LineId) -> Option<Arc<Series>> {
        let removed = self.members.write().shift_remove(&id);
        if let Some(series) = &removed {
            series.detach();
            self.signal.raise(StaleLevel::Structural);
        }
        removed
    }

    /// Removes every member and returns them in insertion order.
    pub fn clear(&self) -> Vec<Arc<Series>> {
        let drained: Vec<Arc<Series>> = self.members.write().drain(..).map(|(_, s)| s).collect();
        for series in &drained {
            series.detach();
        }
        self.signal.raise(StaleLevel::Structural);
        drained
    }

    #[must_use]
    pub fn get(&self, id: LineId) -> Option<Arc<Series>> {
        self.members.read().get(&id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: LineId) -> bool {
        self.members.read().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<LineId> {
        self.members.read().keys().copied().collect()
    }

    /// Snapshot of the members in insertion order.
    #[must_use]
    pub fn series(&self) -> Vec<Arc<Series>> {
        self.members.read().values().cloned().collect()
    }

    #[must_use]
    pub fn x_transform(&self) -> XValueTransform {
        *self.x_transform.read()
    }

    pub fn set_x_transform(&self, transform: XValueTransform) {
        *self.x_transform.write() = transform;
        self.signal.raise(StaleLevel::Structural);
    }

    /// Drops all cached bounds; incremental bounds restart from a full scan.
    pub fn reset_bounds(&self) {
        self.signal.raise(StaleLevel::Structural);
    }

    /// Domain (x) bounds under `policy`; `dirty` lists lines mutated since the
    /// last coalesced redraw. `None` means "no data, keep the previous axis".
    pub fn domain_bounds(
        &self,
        policy: BoundsPolicy,
        dirty: &[LineId],
    ) -> PlotResult<Option<AxisRange>> {
        let bounds = match policy {
            BoundsPolicy::FullScan => self.full_scan().domain,
            BoundsPolicy::StripWindow { width, .. } => self.strip_domain(width, dirty),
            BoundsPolicy::Turbo {
                pinned_domain: Some(pinned),
                ..
            } => return Ok(Some(pinned)),
            BoundsPolicy::Turbo { .. } => self.turbo(dirty).domain,
        };
        Ok(bounds.map(AxisRange::non_degenerate))
    }

    /// Range (y) bounds under `policy`.
    pub fn range_bounds(
        &self,
        policy: BoundsPolicy,
        dirty: &[LineId],
    ) -> PlotResult<Option<AxisRange>> {
        let bounds = match policy {
            BoundsPolicy::FullScan => self.full_scan().range,
            BoundsPolicy::StripWindow {
                pinned_range: Some(pinned),
                ..
            }
            | BoundsPolicy::Turbo {
                pinned_range: Some(pinned),
                ..
            } => return Ok(Some(pinned)),
            BoundsPolicy::StripWindow { width, .. } => match self.strip_domain(width, dirty) {
                Some(window) => self.strip_range(window, dirty)?,
                None => None,
            },
            BoundsPolicy::Turbo {
                pinned_domain: Some(pinned),
                ..
            } => self.range_within_pinned(pinned)?,
            BoundsPolicy::Turbo { .. } => self.turbo(dirty).range,
        };
        Ok(bounds.map(AxisRange::non_degenerate))
    }

    fn locked_cache(&self) -> parking_lot::MutexGuard<'_, BoundsCache> {
        let mut cache = self.cache.lock();
        cache.apply(self.signal.take());
        cache
    }

    fn visible_members(&self) -> Vec<Arc<Series>> {
        self.members
            .read()
            .values()
            .filter(|series| series.is_visible())
            .cloned()
            .collect()
    }

    fn dirty_visible_members(&self, dirty: &[LineId]) -> Vec<Arc<Series>> {
        let members = self.members.read();
        dirty
            .iter()
            .filter_map(|id| members.get(id))
            .filter(|series| series.is_visible())
            .cloned()
            .collect()
    }

    fn full_scan(&self) -> AxisBounds {
        let mut cache = self.locked_cache();
        if let Some(full) = cache.full {
            return full;
        }
        let bounds = AxisBounds::from_extrema(
            union_extrema(&self.visible_members()),
            self.x_transform(),
        );
        trace!(axis = ?self.axis, ?bounds, "full-scan bounds recomputed");
        cache.full = Some(bounds);
        bounds
    }

    fn turbo(&self, dirty: &[LineId]) -> AxisBounds {
        let mut cache = self.locked_cache();
        let x_transform = self.x_transform();
        let bounds = match cache.turbo {
            Some(mut previous) => {
                let grown = union_extrema(&self.dirty_visible_members(dirty));
                previous.merge(AxisBounds::from_extrema(grown, x_transform));
                previous
            }
            None => {
                AxisBounds::from_extrema(union_extrema(&self.visible_members()), x_transform)
            }
        };
        cache.turbo = Some(bounds);
        bounds
    }

    fn strip_domain(&self, width: f64, dirty: &[LineId]) -> Option<AxisRange> {
        let x_transform = self.x_transform();
        let newest = self
            .dirty_visible_members(dirty)
            .iter()
            .filter_map(|series| series.extrema().x_range())
            .map(|range| x_transform.apply_range(range).upper)
            .fold(f64::NEG_INFINITY, f64::max);
        if !newest.is_finite() {
            return None;
        }
        Some(AxisRange {
            lower: newest - width,
            upper: newest,
        })
    }

    fn strip_range(&self, window: AxisRange, dirty: &[LineId]) -> PlotResult<Option<AxisRange>> {
        let raw_window = self.x_transform().invert_range(window);
        let mut range = None;
        for series in self.dirty_visible_members(dirty) {
            range = merge_ranges(range, series.bounds_within(raw_window)?);
        }
        Ok(range)
    }

    fn range_within_pinned(&self, pinned: AxisRange) -> PlotResult<Option<AxisRange>> {
        let mut cache = self.locked_cache();
        if let Some((window, range)) = cache.within_pinned {
            if window == pinned {
                return Ok(range);
            }
        }
        let raw_window = self.x_transform().invert_range(pinned);
        let mut range = None;
        for series in self.visible_members() {
            range = merge_ranges(range, series.bounds_within(raw_window)?);
        }
        cache.within_pinned = Some((pinned, range));
        Ok(range)
    }
}

fn merge_ranges(a: Option<AxisRange>, b: Option<AxisRange>) -> Option<AxisRange> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(not(feature = "parallel-bounds"))]
fn union_extrema(series: &[Arc<Series>]) -> Extrema {
    let mut extrema = Extrema::empty();
    for member in series {
        extrema.merge(member.extrema());
    }
    extrema
}

#[cfg(feature = "parallel-bounds")]
fn union_extrema(series: &[Arc<Series>]) -> Extrema {
    series
        .par_iter()
        .map(|member| member.extrema())
        .reduce(Extrema::empty, |mut acc, next| {
            acc.merge(next);
            acc
        })
}
