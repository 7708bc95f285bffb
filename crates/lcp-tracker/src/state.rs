//! LCP candidate state machine: `idle -> armed -> candidate-set -> finalized`.

use lazyscope_core_types::{HostId, RecordKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::LcpError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LcpPhase {
    Idle,
    Armed,
    CandidateSet,
    Finalized,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LcpElementType {
    Image,
    SvgImage,
    BackgroundElement,
    /// The paint target was not an image (text block, video poster, ...).
    NonImageContent,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LcpOrigin {
    PaintTiming,
    Heuristic,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LcpState {
    pub phase: LcpPhase,
    pub candidate: Option<RecordKey>,
    pub value_ms: Option<f64>,
    pub element_type: Option<LcpElementType>,
    pub origin: Option<LcpOrigin>,
    pub url: Option<String>,
}

impl Default for LcpState {
    fn default() -> Self {
        Self {
            phase: LcpPhase::Idle,
            candidate: None,
            value_ms: None,
            element_type: None,
            origin: None,
            url: None,
        }
    }
}

impl LcpState {
    pub fn is_finalized(&self) -> bool {
        self.phase == LcpPhase::Finalized
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, LcpPhase::Armed | LcpPhase::CandidateSet)
    }
}

/// One candidate report, from a paint entry or from the heuristic.
#[derive(Clone, Debug, PartialEq)]
pub struct LcpObservation {
    pub candidate: Option<RecordKey>,
    pub value_ms: f64,
    pub element_type: LcpElementType,
    pub origin: LcpOrigin,
    pub url: Option<String>,
}

/// A real transition of the candidate key or the value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LcpChange {
    pub previous: Option<RecordKey>,
    pub state: LcpState,
    pub previous_host: Option<HostId>,
    pub current_host: Option<HostId>,
}

#[derive(Debug, Default)]
pub struct LcpTracker {
    state: LcpState,
    activations: u64,
}

impl LcpTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LcpState {
        &self.state
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Arm for a new activation. The value measured in an earlier activation
    /// of the same page session is kept.
    pub fn activate(&mut self) {
        let value_ms = self.state.value_ms;
        self.state = LcpState {
            phase: LcpPhase::Armed,
            value_ms,
            ..LcpState::default()
        };
        self.activations += 1;
        info!(target: "lcp-tracker", activation = self.activations, "lcp tracker armed");
    }

    /// Back to idle; only the measured value survives.
    pub fn deactivate(&mut self) {
        let value_ms = self.state.value_ms;
        self.state = LcpState {
            value_ms,
            ..LcpState::default()
        };
        debug!(target: "lcp-tracker", "lcp tracker idle");
    }

    /// Apply an observation. Returns the change when the candidate key or the
    /// value actually moved; `None` when ignored or nothing changed.
    pub fn observe(&mut self, observation: LcpObservation) -> Option<LcpChange> {
        match self.state.phase {
            LcpPhase::Idle => {
                debug!(target: "lcp-tracker", "observation while idle ignored");
                return None;
            }
            LcpPhase::Finalized => {
                debug!(
                    target: "lcp-tracker",
                    value_ms = observation.value_ms,
                    "observation after finalization ignored"
                );
                return None;
            }
            LcpPhase::Armed | LcpPhase::CandidateSet => {}
        }

        let previous = self.state.candidate;
        let previous_value = self.state.value_ms;
        let value_ms = match previous_value {
            Some(old) => old.max(observation.value_ms),
            None => observation.value_ms,
        };
        let candidate = match observation.element_type {
            LcpElementType::NonImageContent => None,
            _ => observation.candidate,
        };

        self.state.phase = LcpPhase::CandidateSet;
        self.state.candidate = candidate;
        self.state.value_ms = Some(value_ms);
        self.state.element_type = Some(observation.element_type);
        self.state.origin = Some(observation.origin);
        self.state.url = observation.url;

        if previous == candidate && previous_value == Some(value_ms) {
            return None;
        }
        debug!(
            target: "lcp-tracker",
            ?previous,
            ?candidate,
            value_ms,
            origin = ?observation.origin,
            "lcp candidate updated"
        );
        Some(LcpChange {
            previous,
            state: self.state.clone(),
            previous_host: None,
            current_host: None,
        })
    }

    /// Settle the measurement.
    pub fn finalize(&mut self) -> Result<(), LcpError> {
        match self.state.phase {
            LcpPhase::Idle => return Err(LcpError::NotArmed),
            LcpPhase::Finalized => return Err(LcpError::Finalized),
            LcpPhase::Armed | LcpPhase::CandidateSet => {}
        }
        self.state.phase = LcpPhase::Finalized;
        info!(
            target: "lcp-tracker",
            candidate = ?self.state.candidate,
            value_ms = ?self.state.value_ms,
            "lcp finalized"
        );
        Ok(())
    }

    /// Heuristic selection only runs before any real paint report arrived.
    pub fn needs_fallback(&self) -> bool {
        self.state.is_active()
            && self.state.candidate.is_none()
            && self.state.origin != Some(LcpOrigin::PaintTiming)
    }

    /// Drop a candidate whose element left the document.
    pub fn forget(&mut self, key: RecordKey) -> Option<LcpChange> {
        if !self.state.is_active() || self.state.candidate != Some(key) {
            return None;
        }
        self.state.candidate = None;
        Some(LcpChange {
            previous: Some(key),
            state: self.state.clone(),
            previous_host: None,
            current_host: None,
        })
    }
}
