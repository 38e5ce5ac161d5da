//! Admission scheduler for stepping legs.
//!
//! Legs that want to step join a waiting list. Once per frame [`GaitScheduler::tick`]
//! moves waiting legs into the active (stepping) set, in arrival order, unless
//! an active leg blocks them:
//! - a leg on the opposite side with the same index parity, or
//! - a leg on the same side with a neighbouring index.
//!
//! A waiting leg that is already fully extended bypasses the block so it can
//! never be starved. The resulting pattern on a six-legged body is an
//! alternating tripod.

use skitter_core::types::LegId;
use tracing::{debug, warn};

/// Whether an active leg prevents a waiting leg from starting its step.
pub const fn blocks(waiting: LegId, active: LegId) -> bool {
    waiting.is_diagonal_partner(active) || waiting.is_neighbour(active)
}

/// A leg moved from the waiting list into the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub leg: LegId,
    /// Admitted despite a blocking leg because it was fully extended.
    pub overridden: bool,
}

/// Waiting list plus active set of stepping legs.
///
/// A leg is in at most one of the two at any time.
#[derive(Debug, Clone, Default)]
pub struct GaitScheduler {
    /// Insertion order is admission priority.
    waiting: Vec<LegId>,
    active: Vec<LegId>,
}

impl GaitScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a leg for stepping. Ignored if it is already waiting or active.
    ///
    /// Returns whether the leg was added.
    pub fn request_step(&mut self, leg: LegId) -> bool {
        if self.is_waiting(leg) || self.is_active(leg) {
            return false;
        }
        self.waiting.push(leg);
        true
    }

    /// Whether `leg` has been admitted and may step.
    pub fn can_step(&self, leg: LegId) -> bool {
        self.is_active(leg)
    }

    /// Remove a leg from the active set once its step has landed.
    ///
    /// Returns `false` (and logs) if the leg was not active.
    pub fn release(&mut self, leg: LegId) -> bool {
        if let Some(pos) = self.active.iter().position(|&l| l == leg) {
            self.active.remove(pos);
            debug!(%leg, "leg released");
            true
        } else {
            warn!(%leg, "release of a leg that is not stepping");
            false
        }
    }

    /// Admit waiting legs.
    ///
    /// Each waiting leg is checked against the active set as it stood when the
    /// tick began together with the legs already admitted earlier in this
    /// tick. All admissions are then applied at once, so the exclusion rules
    /// hold among the whole active set afterwards (apart from overrides).
    pub fn tick(&mut self, mut is_fully_extended: impl FnMut(LegId) -> bool) -> Vec<Admission> {
        let mut admitted: Vec<Admission> = Vec::new();

        for &leg in &self.waiting {
            let blocked = self
                .active
                .iter()
                .copied()
                .chain(admitted.iter().map(|a| a.leg))
                .any(|other| blocks(leg, other));

            if !blocked {
                admitted.push(Admission {
                    leg,
                    overridden: false,
                });
            } else if is_fully_extended(leg) {
                admitted.push(Admission {
                    leg,
                    overridden: true,
                });
            }
        }

        if !admitted.is_empty() {
            self.waiting.retain(|leg| !admitted.iter().any(|a| a.leg == *leg));
            for admission in &admitted {
                debug!(leg = %admission.leg, overridden = admission.overridden, "leg admitted");
                self.active.push(admission.leg);
            }
        }

        admitted
    }

    pub fn is_waiting(&self, leg: LegId) -> bool {
        self.waiting.contains(&leg)
    }

    pub fn is_active(&self, leg: LegId) -> bool {
        self.active.contains(&leg)
    }

    /// Waiting legs in admission order.
    pub fn waiting(&self) -> &[LegId] {
        &self.waiting
    }

    /// Currently stepping legs in admission order.
    pub fn active(&self) -> &[LegId] {
        &self.active
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
