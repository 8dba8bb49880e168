//! Debouncing of raw button edges.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use crate::input::RawEdge;
use crate::input::SourceId;

/// One user intended button activation, after debouncing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LogicalPress {
    pub source: SourceId,
    pub at: Instant,
}

/// Collapses the noisy transitions of a mechanical switch into at most
/// one logical press per debounce window.
#[derive(Debug)]
pub(crate) struct Debouncer {
    interval: Duration,
    /// Last accepted press per source, created lazily and kept for the
    /// process lifetime.
    windows: HashMap<SourceId, Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            windows: HashMap::new(),
        }
    }

    /// Release edges and presses inside the window are dropped
    /// silently; only the first clean press per window is the user's
    /// intent.
    pub fn accept(&mut self, edge: RawEdge) -> Option<LogicalPress> {
        if !edge.pressed {
            return None;
        }
        if let Some(&last) = self.windows.get(&edge.source) {
            if edge.at.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.windows.insert(edge.source, edge.at);
        Some(LogicalPress {
            source: edge.source,
            at: edge.at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    fn press(source: u32, at: Instant) -> RawEdge {
        RawEdge {
            source: SourceId(source),
            at,
            pressed: true,
        }
    }

    #[test]
    fn bounce_within_window_emits_once() {
        let mut deb = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        assert!(deb.accept(press(0, t0)).is_some());
        assert!(deb.accept(press(0, t0 + Duration::from_millis(50))).is_none());
        assert!(deb.accept(press(0, t0 + Duration::from_millis(299))).is_none());
    }

    #[test]
    fn presses_outside_window_both_emit() {
        let mut deb = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        assert!(deb.accept(press(0, t0)).is_some());
        assert!(deb.accept(press(0, t0 + Duration::from_millis(301))).is_some());
    }

    #[test]
    fn releases_are_dropped_silently() {
        let mut deb = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        let release = RawEdge {
            source: SourceId(0),
            at: t0,
            pressed: false,
        };
        assert!(deb.accept(release).is_none());
        // A release does not open a window either.
        assert!(deb.accept(press(0, t0 + Duration::from_millis(1))).is_some());
    }

    #[test]
    fn windows_are_per_source() {
        let mut deb = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        assert!(deb.accept(press(0, t0)).is_some());
        assert!(deb.accept(press(1, t0 + Duration::from_millis(10))).is_some());
        assert!(deb.accept(press(0, t0 + Duration::from_millis(10))).is_none());
    }
}
