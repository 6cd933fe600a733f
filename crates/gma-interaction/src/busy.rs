//! Busy indicator bracketing in-flight service calls.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives show/hide notifications, e.g. to drive a spinner.
///
/// `show` fires when the first call starts and `hide` when the last
/// overlapping call finishes.
pub trait BusyIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

#[derive(Debug, Default)]
pub struct NoopBusyIndicator;

impl BusyIndicator for NoopBusyIndicator {
    fn show(&self) {}
    fn hide(&self) {}
}

/// In-flight counter in front of a [`BusyIndicator`].
pub(crate) struct BusyTracker {
    in_flight: AtomicUsize,
    indicator: Arc<dyn BusyIndicator>,
}

impl BusyTracker {
    pub(crate) fn new(indicator: Arc<dyn BusyIndicator>) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            indicator,
        }
    }

    pub(crate) fn enter(&self) -> BusyGuard<'_> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.indicator.show();
        }
        BusyGuard { tracker: self }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Released on drop, whichever way the call ends.
pub(crate) struct BusyGuard<'a> {
    tracker: &'a BusyTracker,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.indicator.hide();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndicator {
        events: Mutex<Vec<&'static str>>,
    }

    impl BusyIndicator for RecordingIndicator {
        fn show(&self) {
            self.events.lock().unwrap().push("show");
        }
        fn hide(&self) {
            self.events.lock().unwrap().push("hide");
        }
    }

    #[test]
    fn test_overlapping_guards_show_and_hide_once() {
        let indicator = Arc::new(RecordingIndicator::default());
        let tracker = BusyTracker::new(indicator.clone());

        let first = tracker.enter();
        let second = tracker.enter();
        assert_eq!(tracker.in_flight(), 2);
        drop(first);
        assert_eq!(*indicator.events.lock().unwrap(), vec!["show"]);
        drop(second);

        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(*indicator.events.lock().unwrap(), vec!["show", "hide"]);
    }
}
