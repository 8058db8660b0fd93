//! Tracking allocator - accounting wrapper around another handle
//!
//! Forwards every request to an inner allocator while recording live bytes,
//! call counts and the peak footprint. An optional byte budget makes
//! requests fail once the live total would exceed it, which is how
//! out-of-memory paths are exercised deterministically.

use super::{Allocer, AllocerVTable, Layout};
use core::cell::Cell;
use core::ptr::NonNull;

static TRACKING_VTABLE: AllocerVTable = AllocerVTable {
    alloc: tracking_alloc,
    free: tracking_free,
    // Composed by the handle so accounting goes through alloc/free
    realloc: None,
    zalloc: Some(tracking_zalloc),
};

/// Snapshot of tracking counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackingStats {
    /// Successful allocations
    pub allocations: usize,
    /// Frees of non-null blocks
    pub frees: usize,
    /// Requests refused by the budget or the inner allocator
    pub failures: usize,
    /// Bytes currently live
    pub outstanding_bytes: usize,
    /// Highest value `outstanding_bytes` reached
    pub peak_bytes: usize,
}

/// Accounting allocator state
///
/// Single-threaded; hand out handles with [`allocer`](Self::allocer).
pub struct TrackingAllocer<'a> {
    inner: Allocer<'a>,
    budget: Cell<Option<usize>>,
    stats: Cell<TrackingStats>,
}

impl<'a> TrackingAllocer<'a> {
    pub fn new(inner: Allocer<'a>) -> Self {
        Self {
            inner,
            budget: Cell::new(None),
            stats: Cell::new(TrackingStats::default()),
        }
    }

    /// Tracking allocator whose live bytes may not exceed `budget`
    pub fn with_budget(inner: Allocer<'a>, budget: usize) -> Self {
        let tracker = Self::new(inner);
        tracker.set_budget(Some(budget));
        tracker
    }

    /// Handle dispatching through this tracker
    #[inline]
    pub fn allocer(&self) -> Allocer<'_> {
        unsafe { Allocer::from_raw_parts(self as *const Self as *mut (), &TRACKING_VTABLE) }
    }

    pub fn set_budget(&self, budget: Option<usize>) {
        self.budget.set(budget);
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget.get()
    }

    pub fn stats(&self) -> TrackingStats {
        self.stats.get()
    }

    /// Bytes handed out and not yet freed
    pub fn outstanding_bytes(&self) -> usize {
        self.stats.get().outstanding_bytes
    }

    fn admit(&self, layout: Layout) -> bool {
        match self.budget.get() {
            Some(budget) => self
                .outstanding_bytes()
                .checked_add(layout.size())
                .map_or(false, |total| total <= budget),
            None => true,
        }
    }

    fn record(&self, result: Option<NonNull<u8>>, layout: Layout) -> Option<NonNull<u8>> {
        let mut stats = self.stats.get();
        match result {
            Some(_) => {
                stats.allocations += 1;
                stats.outstanding_bytes += layout.size();
                stats.peak_bytes = stats.peak_bytes.max(stats.outstanding_bytes);
            }
            None => stats.failures += 1,
        }
        self.stats.set(stats);
        result
    }

    fn request(&self, layout: Layout, zeroed: bool) -> Option<NonNull<u8>> {
        if !self.admit(layout) {
            tracing::trace!(
                target: "strata::tracking",
                size = layout.size(),
                budget = ?self.budget.get(),
                "request refused by budget"
            );
            return self.record(None, layout);
        }
        let result = if zeroed {
            self.inner.zalloc(layout)
        } else {
            self.inner.alloc(layout)
        };
        self.record(result, layout)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        let mut stats = self.stats.get();
        stats.frees += 1;
        stats.outstanding_bytes = stats.outstanding_bytes.saturating_sub(layout.size());
        self.stats.set(stats);
        self.inner.free(ptr.as_ptr(), layout);
    }
}

unsafe fn tracking_alloc(state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    (*(state as *const TrackingAllocer<'_>)).request(layout, false)
}

unsafe fn tracking_zalloc(state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    (*(state as *const TrackingAllocer<'_>)).request(layout, true)
}

unsafe fn tracking_free(state: *mut (), ptr: NonNull<u8>, layout: Layout) {
    (*(state as *const TrackingAllocer<'_>)).release(ptr, layout)
}
