//! Debounced window-resize handling.
//!
//! During a drag-resize the OS delivers many size events in quick
//! succession:
//!
//! ```text
//! Time:   0ms   16ms  32ms  48ms  ...  500ms (user stops dragging)
//! Events:  R     R     R     R    ...    R
//! Sizes:  800   820   850   900  ...   1200
//! ```
//!
//! Rebuilding the presentation targets on every event stalls the GPU
//! dozens of times per drag. [`ResizeManager`] buffers the events and
//! reports a single size once a quiet period has elapsed; the frame
//! pipeline then performs one target rebuild and one graph
//! reconstruction at the final size.

use std::time::{Duration, Instant};

use crate::types::Extent2d;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);
const MIN_SIZE: u32 = 1;

/// Buffers OS resize events and applies them after a quiet period.
#[derive(Debug)]
pub struct ResizeManager {
    current: Extent2d,
    pending: Option<Extent2d>,
    last_event: Option<Instant>,
    debounce: Duration,
    min_size: Extent2d,
}

impl ResizeManager {
    /// Manager starting at `initial` with the default 50ms debounce.
    pub fn new(initial: Extent2d) -> Self {
        Self {
            current: initial,
            pending: None,
            last_event: None,
            debounce: DEFAULT_DEBOUNCE,
            min_size: Extent2d::new(MIN_SIZE, MIN_SIZE),
        }
    }

    /// Override the quiet period.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override the minimum size events are clamped to. Minimized windows
    /// report zero extents, which are never valid target sizes.
    pub fn with_min_size(mut self, min: Extent2d) -> Self {
        self.min_size = min;
        self
    }

    /// Record an OS resize event. Restarts the quiet period.
    pub fn on_resize_event(&mut self, size: Extent2d) {
        let clamped = Extent2d::new(
            size.width.max(self.min_size.width),
            size.height.max(self.min_size.height),
        );
        if clamped == self.current && self.pending.is_none() {
            return;
        }
        log::trace!("resize event {}x{}", clamped.width, clamped.height);
        self.pending = Some(clamped);
        self.last_event = Some(Instant::now());
    }

    /// Poll once per frame. Returns the settled size when the quiet
    /// period has elapsed since the last event, consuming the pending
    /// resize.
    pub fn update(&mut self) -> Option<Extent2d> {
        let pending = self.pending?;
        let last = self.last_event?;
        if last.elapsed() < self.debounce {
            return None;
        }
        self.settle(pending)
    }

    /// Apply the pending resize immediately, ignoring the quiet period.
    pub fn force_resize(&mut self) -> Option<Extent2d> {
        let pending = self.pending?;
        self.settle(pending)
    }

    fn settle(&mut self, pending: Extent2d) -> Option<Extent2d> {
        self.pending = None;
        self.last_event = None;
        if pending == self.current {
            return None;
        }
        self.current = pending;
        log::info!("resize settled at {}x{}", pending.width, pending.height);
        Some(pending)
    }

    /// True while events are buffered and the quiet period has not
    /// elapsed.
    pub fn is_resizing(&self) -> bool {
        self.pending.is_some()
    }

    /// The last applied size.
    pub fn current_size(&self) -> Extent2d {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ResizeManager {
        ResizeManager::new(Extent2d::new(800, 600)).with_debounce(Duration::from_millis(0))
    }

    #[test]
    fn test_no_event_no_resize() {
        let mut mgr = manager();
        assert_eq!(mgr.update(), None);
        assert!(!mgr.is_resizing());
    }

    #[test]
    fn test_event_applies_after_quiet_period() {
        let mut mgr = manager();
        mgr.on_resize_event(Extent2d::new(1024, 768));
        assert!(mgr.is_resizing());
        assert_eq!(mgr.update(), Some(Extent2d::new(1024, 768)));
        assert_eq!(mgr.current_size(), Extent2d::new(1024, 768));
        assert_eq!(mgr.update(), None);
    }

    #[test]
    fn test_debounce_holds_back_pending_resize() {
        let mut mgr =
            ResizeManager::new(Extent2d::new(800, 600)).with_debounce(Duration::from_secs(60));
        mgr.on_resize_event(Extent2d::new(1024, 768));
        assert_eq!(mgr.update(), None);
        assert!(mgr.is_resizing());

        // force_resize skips the quiet period.
        assert_eq!(mgr.force_resize(), Some(Extent2d::new(1024, 768)));
    }

    #[test]
    fn test_force_resize_without_pending_is_noop() {
        let mut mgr =
            ResizeManager::new(Extent2d::new(800, 600)).with_debounce(Duration::from_secs(60));
        assert_eq!(mgr.force_resize(), None);
        assert_eq!(mgr.current_size(), Extent2d::new(800, 600));
    }

    #[test]
    fn test_last_event_wins() {
        let mut mgr = manager();
        mgr.on_resize_event(Extent2d::new(820, 610));
        mgr.on_resize_event(Extent2d::new(900, 700));
        mgr.on_resize_event(Extent2d::new(1200, 900));
        assert_eq!(mgr.update(), Some(Extent2d::new(1200, 900)));
    }

    #[test]
    fn test_zero_extent_is_clamped() {
        let mut mgr = manager();
        mgr.on_resize_event(Extent2d::new(0, 0));
        assert_eq!(mgr.update(), Some(Extent2d::new(1, 1)));
    }

    #[test]
    fn test_resize_back_to_current_is_dropped() {
        let mut mgr = manager();
        mgr.on_resize_event(Extent2d::new(1024, 768));
        mgr.on_resize_event(Extent2d::new(800, 600));
        assert_eq!(mgr.update(), None);
        assert_eq!(mgr.current_size(), Extent2d::new(800, 600));
    }
}
