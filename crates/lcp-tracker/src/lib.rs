//! Largest-contentful-paint candidate tracking.
//!
//! [`LcpTracker`] is the synchronous state machine; [`LcpSchedule`] owns the
//! timers of one activation and calls back through [`LcpPort`]. Heuristic
//! selection lives in [`heuristic`] for pages without paint timing.

pub mod config;
pub mod errors;
pub mod heuristic;
pub mod listeners;
pub mod scheduler;
pub mod state;

pub use config::LcpConfig;
pub use errors::LcpError;
pub use heuristic::{select, synthetic_timing_ms, HeuristicCandidate};
pub use listeners::{LcpCallback, LcpListeners};
pub use scheduler::{LcpPort, LcpSchedule, PollOutcome};
pub use state::{
    LcpChange, LcpElementType, LcpObservation, LcpOrigin, LcpPhase, LcpState, LcpTracker,
};

use lazyscope_core_types::PaintEntry;

/// Only the most recent entry of a delivered batch is considered.
pub fn latest_entry(batch: &[PaintEntry]) -> Option<&PaintEntry> {
    batch.last()
}
