use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::core::LineId;

/// Lines mutated since the last coalesced redraw, in first-touch order.
///
/// Producers insert from any thread; the redraw pass drains atomically.
#[derive(Debug, Default)]
pub struct DirtySet {
    lines: Mutex<IndexSet<LineId>>,
}

impl DirtySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the line was not already pending.
    pub fn insert(&self, id: LineId) -> bool {
        self.lines.lock().insert(id)
    }

    /// Takes every pending line; a second drain without inserts is empty.
    pub fn drain(&self) -> Vec<LineId> {
        std::mem::take(&mut *self.lines.lock()).into_iter().collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<LineId> {
        self.lines.lock().iter().copied().collect()
    }

    #[must_use]
    pub fn contains(&self, id: LineId) -> bool {
        self.lines.lock().contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn remove(&self, id: LineId) -> bool {
        self.lines.lock().shift_remove(&id)
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}
