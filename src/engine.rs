//! Engine façade: activation lifecycle, classification feeds and LCP dispatch.
//!
//! All mutable state sits behind one lock. Paint batches, mutation batches and
//! timer callbacks each take it once, apply their update, and release it before
//! listeners run, so every listener sees the fully updated [`LcpState`].

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use image_perceiver::{
    AggregateSnapshot, ClassificationSession, ExportRecord, ImageRecord, LazyLibrary,
    LibraryUsage, MutationOutcome, Position,
};
use lazyscope_core_types::{
    ElementKind, ElementSnapshot, HostId, MutationBatch, PageSnapshot, PaintEntry, RecordKey,
};
use lcp_tracker::{
    latest_entry, select, synthetic_timing_ms, HeuristicCandidate, LcpChange, LcpElementType,
    LcpListeners, LcpObservation, LcpOrigin, LcpPort, LcpSchedule, LcpState, LcpTracker,
    PollOutcome,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::telemetry;

/// Entry point used by collaborators (overlay renderer, messaging, export).
#[derive(Clone)]
pub struct ImageEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    state: Mutex<EngineState>,
    listeners: LcpListeners,
    schedule: Mutex<Option<LcpSchedule>>,
}

#[derive(Default)]
struct EngineState {
    session: Option<ClassificationSession>,
    tracker: LcpTracker,
}

impl ImageEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                state: Mutex::new(EngineState::default()),
                listeners: LcpListeners::new(),
                schedule: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Start a session over `page`: full scan, tracker armed, timers started.
    /// An already active session is torn down first so timers are rearmed
    /// fresh. Timers need a tokio runtime; without one only manual
    /// [`finalize`](Self::finalize) and [`detect_lcp_fallback`](Self::detect_lcp_fallback)
    /// drive the tracker.
    pub fn activate(&self, page: PageSnapshot) -> usize {
        self.deactivate();

        let paint_timing = page.capabilities.paint_timing;
        let url = page.url.clone();
        let (scanned, activation) = {
            let mut state = self.inner.state.lock();
            let mut session = ClassificationSession::new(page, self.inner.config.analysis.clone());
            let scanned = session.scan();
            state.session = Some(session);
            state.tracker.activate();
            (scanned, state.tracker.activations())
        };

        if !paint_timing {
            info!(target: "lazyscope", "paint timing unavailable; lcp uses heuristic fallback only");
        }

        if tokio::runtime::Handle::try_current().is_ok() {
            let port: Arc<dyn LcpPort> = Arc::new(EnginePort {
                inner: Arc::downgrade(&self.inner),
                activation,
            });
            let schedule = LcpSchedule::arm(port, &self.inner.config.lcp);
            *self.inner.schedule.lock() = Some(schedule);
        } else {
            warn!(target: "lazyscope", "no async runtime; lcp timers not armed");
        }

        info!(target: "lazyscope", %url, images = scanned, activation, "engine activated");
        scanned
    }

    /// Cancel timers and drop the session. The measured LCP value survives.
    pub fn deactivate(&self) {
        let schedule = self.inner.schedule.lock().take();
        if let Some(schedule) = schedule {
            schedule.cancel();
        }
        let mut state = self.inner.state.lock();
        if state.session.take().is_some() {
            state.tracker.deactivate();
            info!(target: "lazyscope", "engine deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// Classify (or re-classify) one element. Idempotent for unchanged input.
    pub fn classify(&self, element: &ElementSnapshot) -> EngineResult<ImageRecord> {
        let mut state = self.inner.state.lock();
        let session = state.session.as_mut().ok_or(EngineError::Inactive)?;
        Ok(session.classify(element))
    }

    /// Swap in a new top-level page snapshot and rebuild everything from it.
    pub fn rescan(&self, page: PageSnapshot) -> EngineResult<usize> {
        let (scanned, change) = {
            let mut state = self.inner.state.lock();
            let EngineState { session, tracker } = &mut *state;
            let session = session.as_mut().ok_or(EngineError::Inactive)?;
            let previous_host = tracker
                .state()
                .candidate
                .and_then(|key| session.hosts().host_for(key));
            let scanned = session.replace_page(page);
            let candidate = tracker.state().candidate;
            let change = match candidate {
                Some(key) if session.record(key).is_none() => {
                    tracker.forget(key).map(|mut change| {
                        change.previous_host = previous_host;
                        change
                    })
                }
                _ => None,
            };
            (scanned, change)
        };
        if let Some(change) = change {
            self.inner.publish(&change);
        }
        Ok(scanned)
    }

    /// Structural change feed. A removed LCP candidate is forgotten by the
    /// tracker and reported to listeners.
    pub fn apply_mutations(&self, batch: &MutationBatch) -> EngineResult<MutationOutcome> {
        let (outcome, changes) = {
            let mut state = self.inner.state.lock();
            let EngineState { session, tracker } = &mut *state;
            let session = session.as_mut().ok_or(EngineError::Inactive)?;
            let hosts: BTreeMap<RecordKey, HostId> = batch
                .removed
                .iter()
                .map(|node| RecordKey::from(*node))
                .filter_map(|key| session.hosts().host_for(key).map(|host| (key, host)))
                .collect();
            let outcome = session.apply_mutations(batch);
            let changes: Vec<LcpChange> = outcome
                .removed
                .iter()
                .filter_map(|key| {
                    tracker.forget(*key).map(|mut change| {
                        change.previous_host = hosts.get(key).cloned();
                        change
                    })
                })
                .collect();
            (outcome, changes)
        };
        for change in &changes {
            self.inner.publish(change);
        }
        Ok(outcome)
    }

    /// Raw paint-timing feed. Only the latest entry of the batch counts.
    pub fn observe_paint_entries(&self, batch: &[PaintEntry]) -> Option<LcpChange> {
        let entry = latest_entry(batch)?;
        if batch.len() > 1 {
            debug!(target: "lazyscope", discarded = batch.len() - 1, "earlier paint entries discarded");
        }
        self.inner.observe_paint(entry)
    }

    /// Run heuristic selection now. No-op once a real candidate exists or the
    /// tracker is not active.
    pub fn detect_lcp_fallback(&self) -> Option<LcpChange> {
        self.inner.run_fallback()
    }

    /// Settle the LCP measurement ahead of the timer.
    pub fn finalize(&self) -> EngineResult<()> {
        self.inner.finalize()
    }

    /// Register a listener for LCP candidate/value transitions.
    pub fn on_lcp_change<F>(&self, callback: F)
    where
        F: Fn(&LcpChange) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(callback);
    }

    pub fn lcp_state(&self) -> LcpState {
        self.inner.state.lock().tracker.state().clone()
    }

    pub fn aggregate_counters(&self) -> AggregateSnapshot {
        let state = self.inner.state.lock();
        let lcp_value = state.tracker.state().value_ms;
        match state.session.as_ref() {
            Some(session) => session.counters(lcp_value),
            None => AggregateSnapshot {
                lcp_value,
                ..AggregateSnapshot::default()
            },
        }
    }

    pub fn library_registry(&self) -> BTreeMap<LazyLibrary, LibraryUsage> {
        self.inner
            .state
            .lock()
            .session
            .as_ref()
            .map(|session| session.library_registry())
            .unwrap_or_default()
    }

    pub fn record(&self, key: RecordKey) -> Option<ImageRecord> {
        let state = self.inner.state.lock();
        state.session.as_ref()?.record(key).cloned()
    }

    pub fn records(&self) -> Vec<ImageRecord> {
        let state = self.inner.state.lock();
        state
            .session
            .as_ref()
            .map(|session| session.records().cloned().collect())
            .unwrap_or_default()
    }

    pub fn export_records(&self) -> Vec<ExportRecord> {
        let state = self.inner.state.lock();
        state
            .session
            .as_ref()
            .map(|session| session.export_records())
            .unwrap_or_default()
    }

    /// Remember which overlay host renders `key`; returns the replaced host.
    pub fn bind_host(&self, key: RecordKey, host: HostId) -> EngineResult<Option<HostId>> {
        let state = self.inner.state.lock();
        let session = state.session.as_ref().ok_or(EngineError::Inactive)?;
        Ok(session.bind_host(key, host))
    }
}

impl EngineInner {
    fn observe_paint(&self, entry: &PaintEntry) -> Option<LcpChange> {
        let change = {
            let mut state = self.state.lock();
            let kind = match (state.session.as_ref(), entry.node) {
                (Some(session), Some(node)) => session.element_kind(node),
                _ => None,
            };
            let (candidate, element_type) = match (entry.node, kind) {
                (Some(node), Some(kind)) => (Some(RecordKey::from(node)), element_type(kind)),
                _ => (None, LcpElementType::NonImageContent),
            };
            let observation = LcpObservation {
                candidate,
                value_ms: entry.value_ms(),
                element_type,
                origin: LcpOrigin::PaintTiming,
                url: entry.url.clone(),
            };
            Self::dispatch(&mut state, observation)?
        };
        self.publish(&change);
        Some(change)
    }

    fn run_fallback(&self) -> Option<LcpChange> {
        let change = {
            let mut state = self.state.lock();
            if !state.tracker.needs_fallback() {
                return None;
            }
            let session = state.session.as_ref()?;
            let candidates = heuristic_candidates(session);
            let Some(chosen) = select(&candidates, &self.config.lcp) else {
                debug!(
                    target: "lazyscope",
                    considered = candidates.len(),
                    "no lcp image detected"
                );
                telemetry::record_fallback(false);
                return None;
            };
            let value_ms = synthetic_timing_ms(chosen.estimated_kb, session.page().effective_type());
            let observation = LcpObservation {
                candidate: Some(chosen.key),
                value_ms,
                element_type: chosen.element_type,
                origin: LcpOrigin::Heuristic,
                url: chosen.url.clone(),
            };
            telemetry::record_fallback(true);
            Self::dispatch(&mut state, observation)?
        };
        self.publish(&change);
        Some(change)
    }

    fn finalize(&self) -> EngineResult<()> {
        self.state.lock().tracker.finalize()?;
        telemetry::record_lcp_finalized();
        Ok(())
    }

    fn poll(&self) -> PollOutcome {
        {
            let state = self.state.lock();
            if !state.tracker.state().is_active() || state.tracker.state().candidate.is_some() {
                return PollOutcome::Done;
            }
        }
        match self.run_fallback() {
            Some(_) => PollOutcome::Done,
            None => PollOutcome::Pending,
        }
    }

    /// Single dispatch for every LCP input: tracker first, then the flag on
    /// the affected records, then host lookup for the notification.
    fn dispatch(state: &mut EngineState, observation: LcpObservation) -> Option<LcpChange> {
        let mut change = state.tracker.observe(observation)?;
        if let Some(session) = state.session.as_mut() {
            let reassignment = session.set_lcp_candidate(change.state.candidate);
            change.previous_host = reassignment.previous_host;
            change.current_host = reassignment.current_host;
        }
        telemetry::record_lcp_transition();
        Some(change)
    }

    fn publish(&self, change: &LcpChange) {
        self.listeners.notify(change);
    }
}

/// Timer callbacks. Holds the engine weakly so the timer tasks never keep a
/// dropped engine alive, and ignores callbacks from an earlier activation.
struct EnginePort {
    inner: Weak<EngineInner>,
    activation: u64,
}

impl EnginePort {
    fn current(&self) -> Option<Arc<EngineInner>> {
        let inner = self.inner.upgrade()?;
        let current = inner.state.lock().tracker.activations();
        (current == self.activation).then_some(inner)
    }
}

impl LcpPort for EnginePort {
    fn finalize(&self) {
        if let Some(inner) = self.current() {
            if let Err(err) = inner.finalize() {
                debug!(target: "lazyscope", %err, "finalize timer fired on inactive tracker");
            }
        }
    }

    fn poll(&self) -> PollOutcome {
        match self.current() {
            Some(inner) => inner.poll(),
            None => PollOutcome::Done,
        }
    }
}

fn element_type(kind: ElementKind) -> LcpElementType {
    match kind {
        ElementKind::Img => LcpElementType::Image,
        ElementKind::SvgImage => LcpElementType::SvgImage,
        ElementKind::Background => LcpElementType::BackgroundElement,
    }
}

/// Records in document order, shaped for heuristic selection.
fn heuristic_candidates(session: &ClassificationSession) -> Vec<HeuristicCandidate> {
    session
        .page()
        .elements
        .iter()
        .filter_map(|element| {
            let record = session.record(RecordKey::from(element.node))?;
            Some(HeuristicCandidate {
                key: record.key,
                element_type: element_type(record.kind),
                display: record.display,
                above_fold: record.position == Position::AboveFold,
                visible: element.visible,
                estimated_kb: record.estimated_file_size.kb(),
                url: (!record.source.is_empty()).then(|| record.source.clone()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_perceiver::Strategy;
    use lazyscope_core_types::{NodeId, Viewport};

    fn hero(node: u64) -> ElementSnapshot {
        ElementSnapshot::new(NodeId(node), ElementKind::Img)
            .with_src(format!("/img/hero-{node}.jpg"))
            .with_attr("width", "1200")
            .with_attr("height", "600")
            .with_natural(1200.0, 600.0)
            .with_rect(0.0, 0.0, 1200.0, 600.0)
    }

    fn page(elements: Vec<ElementSnapshot>) -> PageSnapshot {
        let mut page = PageSnapshot::new("https://shop.test/", Viewport::default());
        page.elements = elements;
        page
    }

    #[test]
    fn inactive_engine_rejects_feeds() {
        let engine = ImageEngine::new(EngineConfig::default());
        assert!(matches!(
            engine.classify(&hero(1)),
            Err(EngineError::Inactive)
        ));
        assert!(matches!(
            engine.apply_mutations(&MutationBatch::default()),
            Err(EngineError::Inactive)
        ));
        assert!(engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 100.0)]).is_none());
        assert!(matches!(
            engine.finalize(),
            Err(EngineError::Lcp(lcp_tracker::LcpError::NotArmed))
        ));
    }

    #[test]
    fn activation_without_runtime_still_classifies() {
        let engine = ImageEngine::new(EngineConfig::default());
        assert_eq!(engine.activate(page(vec![hero(1)])), 1);
        assert!(engine.is_active());
        assert_eq!(engine.aggregate_counters().total, 1);
    }

    #[test]
    fn paint_on_untracked_node_keeps_only_the_value() {
        let engine = ImageEngine::new(EngineConfig::default());
        engine.activate(page(vec![hero(1)]));
        let change = engine
            .observe_paint_entries(&[PaintEntry::for_node(NodeId(99), 640.0)])
            .expect("value moved");
        assert_eq!(change.state.candidate, None);
        assert_eq!(change.state.element_type, Some(LcpElementType::NonImageContent));
        assert_eq!(engine.aggregate_counters().lcp_value, Some(640.0));
        assert_eq!(engine.aggregate_counters().lcp_candidates, 0);
    }

    #[test]
    fn removing_the_candidate_notifies_with_its_host() {
        let engine = ImageEngine::new(EngineConfig::default());
        engine.activate(page(vec![hero(1), hero(2)]));
        engine
            .observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 900.0)])
            .expect("candidate set");
        let host = HostId::new();
        engine.bind_host(RecordKey(NodeId(1)), host.clone()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.on_lcp_change(move |change| sink.lock().push(change.clone()));

        let outcome = engine
            .apply_mutations(&MutationBatch {
                added: Vec::new(),
                removed: vec![NodeId(1)],
            })
            .unwrap();
        assert_eq!(outcome.removed, vec![RecordKey(NodeId(1))]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].previous, Some(RecordKey(NodeId(1))));
        assert_eq!(seen[0].previous_host, Some(host));
        assert_eq!(seen[0].state.candidate, None);
        assert_eq!(engine.lcp_state().value_ms, Some(900.0));
    }

    #[test]
    fn rescan_drops_a_vanished_candidate() {
        let engine = ImageEngine::new(EngineConfig::default());
        engine.activate(page(vec![hero(1), hero(2)]));
        engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(2), 700.0)]);
        assert_eq!(engine.rescan(page(vec![hero(1)])).unwrap(), 1);
        assert_eq!(engine.lcp_state().candidate, None);
        assert!(engine
            .records()
            .iter()
            .all(|record| record.strategy != Strategy::Lcp));
    }

    #[test]
    fn deactivation_clears_session_state() {
        let engine = ImageEngine::new(EngineConfig::default());
        engine.activate(page(vec![hero(1)]));
        engine.observe_paint_entries(&[PaintEntry::for_node(NodeId(1), 1_100.0)]);
        engine.deactivate();
        assert!(!engine.is_active());
        assert!(engine.records().is_empty());
        assert!(engine.library_registry().is_empty());
        let counters = engine.aggregate_counters();
        assert_eq!(counters.total, 0);
        assert_eq!(counters.lcp_value, Some(1_100.0));
    }
}
