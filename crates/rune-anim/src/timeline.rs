//! Document-style timeline.
//!
//! The timeline's current time is unresolved until its first update and
//! never moves backwards afterwards. Animations share a timeline through an
//! `Rc<Timeline>` and only read it; the host (or an animation's per-tick
//! update) advances it with frame timestamps.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Timeline {
    origin: f64,
    current_time: Cell<Option<f64>>,
}

impl Timeline {
    /// A timeline whose zero is at timestamp 0.
    pub fn new() -> Rc<Self> {
        Self::with_origin(0.0)
    }

    /// A timeline whose zero is at the given timestamp.
    pub fn with_origin(origin: f64) -> Rc<Self> {
        Rc::new(Self {
            origin,
            current_time: Cell::new(None),
        })
    }

    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Current time in milliseconds, `None` until the first update.
    pub fn current_time(&self) -> Option<f64> {
        self.current_time.get()
    }

    /// Whether the timeline has a resolved current time.
    pub fn is_active(&self) -> bool {
        self.current_time.get().is_some()
    }

    /// Advance to `timestamp`. Timestamps earlier than the current time
    /// leave it unchanged.
    pub fn update(&self, timestamp: f64) -> f64 {
        let time = timestamp - self.origin;
        let time = match self.current_time.get() {
            Some(current) if current > time => current,
            _ => time,
        };
        self.current_time.set(Some(time));
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_until_first_update() {
        let timeline = Timeline::new();
        assert_eq!(timeline.current_time(), None);
        assert!(!timeline.is_active());

        timeline.update(16.0);
        assert_eq!(timeline.current_time(), Some(16.0));
    }

    #[test]
    fn test_monotonic() {
        let timeline = Timeline::with_origin(100.0);
        assert_eq!(timeline.update(150.0), 50.0);
        assert_eq!(timeline.update(120.0), 50.0);
        assert_eq!(timeline.update(200.0), 100.0);
    }
}
