//! Shared test fixtures and utilities for skitter crates.
//!
//! Provides deterministic RNG setup, ground query doubles, a recorder for
//! queued-state feedback, and a seeded plate-terrain generator.

pub mod mocks;
pub mod rng;
pub mod terrain;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{CountingGround, FeedbackLog, NoGround, ScriptedGround};
pub use rng::seeded_rng;
pub use terrain::rough_terrain;
