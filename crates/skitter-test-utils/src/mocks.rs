//! Test doubles for ground queries and queued-state feedback.
//!
//! Ground doubles only implement [`GroundQuery`], so they plug into any leg
//! or body under test. Interior mutability lets them record calls through the
//! trait's `&self` receiver.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nalgebra::Vector3;
use skitter_core::ground::{GroundQuery, LayerMask};
use skitter_core::types::LegId;

// ---------------------------------------------------------------------------
// NoGround
// ---------------------------------------------------------------------------

/// A ground that every ray misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundQuery for NoGround {
    fn raycast_down(&self, _: &Vector3<f32>, _: f32, _: LayerMask) -> Option<Vector3<f32>> {
        None
    }
}

// ---------------------------------------------------------------------------
// CountingGround
// ---------------------------------------------------------------------------

/// Wraps another ground and counts the rays cast against it.
#[derive(Debug, Default)]
pub struct CountingGround<G> {
    inner: G,
    count: Cell<usize>,
}

impl<G: GroundQuery> CountingGround<G> {
    pub const fn new(inner: G) -> Self {
        Self {
            inner,
            count: Cell::new(0),
        }
    }

    /// Number of rays cast so far.
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl<G: GroundQuery> GroundQuery for CountingGround<G> {
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>> {
        self.count.set(self.count.get() + 1);
        self.inner.raycast_down(origin, max_range, exclude)
    }
}

// ---------------------------------------------------------------------------
// ScriptedGround
// ---------------------------------------------------------------------------

/// Replays a fixed sequence of ray results, then misses.
#[derive(Debug, Default)]
pub struct ScriptedGround {
    script: RefCell<VecDeque<Option<Vector3<f32>>>>,
    origins: RefCell<Vec<Vector3<f32>>>,
}

impl ScriptedGround {
    pub fn new(script: Vec<Option<Vector3<f32>>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            origins: RefCell::new(Vec::new()),
        }
    }

    /// Ray origins seen so far, in call order.
    pub fn origins(&self) -> Vec<Vector3<f32>> {
        self.origins.borrow().clone()
    }
}

impl GroundQuery for ScriptedGround {
    fn raycast_down(&self, origin: &Vector3<f32>, _: f32, _: LayerMask) -> Option<Vector3<f32>> {
        self.origins.borrow_mut().push(*origin);
        self.script.borrow_mut().pop_front().flatten()
    }
}

// ---------------------------------------------------------------------------
// FeedbackLog
// ---------------------------------------------------------------------------

/// Shared record of `(leg, queued)` feedback events.
///
/// Hand [`FeedbackLog::recorder`] to the body; keep the log to inspect it.
#[derive(Debug, Clone, Default)]
pub struct FeedbackLog {
    events: Arc<Mutex<Vec<(LegId, bool)>>>,
}

impl FeedbackLog {
    /// A `Send + Sync` callback that appends to this log.
    pub fn recorder(&self) -> impl FnMut(LegId, bool) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |leg, queued| {
            if let Ok(mut events) = events.lock() {
                events.push((leg, queued));
            }
        }
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<(LegId, bool)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Most recent state reported for `leg`.
    pub fn last(&self, leg: LegId) -> Option<bool> {
        self.events()
            .iter()
            .rev()
            .find(|(id, _)| *id == leg)
            .map(|&(_, queued)| queued)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use skitter_core::ground::FlatGround;

    #[test]
    fn no_ground_always_misses() {
        assert!(NoGround
            .raycast_down(&Vector3::new(0.0, 0.0, 5.0), 100.0, LayerMask::NONE)
            .is_none());
    }

    #[test]
    fn counting_ground_counts_and_forwards() {
        let ground = CountingGround::new(FlatGround::new(0.0));
        let origin = Vector3::new(0.0, 0.0, 5.0);
        assert!(ground.raycast_down(&origin, 10.0, LayerMask::NONE).is_some());
        assert!(ground.raycast_down(&origin, 1.0, LayerMask::NONE).is_none());
        assert_eq!(ground.count(), 2);
    }

    #[test]
    fn scripted_ground_replays_then_misses() {
        let hit = Vector3::new(1.0, 2.0, 0.0);
        let ground = ScriptedGround::new(vec![Some(hit), None]);
        let origin = Vector3::new(0.0, 0.0, 5.0);
        assert_eq!(ground.raycast_down(&origin, 10.0, LayerMask::NONE), Some(hit));
        assert_eq!(ground.raycast_down(&origin, 10.0, LayerMask::NONE), None);
        assert_eq!(ground.raycast_down(&origin, 10.0, LayerMask::NONE), None);
        assert_eq!(ground.origins().len(), 3);
    }

    #[test]
    fn feedback_log_records_through_recorder() {
        let log = FeedbackLog::default();
        let mut record = log.recorder();
        record(LegId::left(0), true);
        record(LegId::right(1), true);
        record(LegId::left(0), false);

        assert_eq!(log.events().len(), 3);
        assert_eq!(log.last(LegId::left(0)), Some(false));
        assert_eq!(log.last(LegId::right(1)), Some(true));
        assert_eq!(log.last(LegId::left(2)), None);
    }
}
