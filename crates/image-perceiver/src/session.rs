//! Classification context owned by one activation of the engine.
//!
//! The session holds every piece of page-wide mutable state (library
//! registry, aggregate counters, records, host index) and is passed by
//! reference into each classification instead of living in globals.

use std::collections::BTreeMap;

use lazyscope_core_types::{
    ElementKind, ElementSnapshot, HostId, MutationBatch, NodeId, PageSnapshot, RecordKey,
    SessionId,
};
use tracing::{debug, info, warn};

use crate::classifier::{ClassifyContext, StrategyClassifier};
use crate::counters::{AggregateCounters, AggregateSnapshot};
use crate::errors::PerceiverError;
use crate::export::ExportRecord;
use crate::hosts::HostIndex;
use crate::library::{LibraryRegistry, LibraryUsage, PageSignals};
use crate::metrics;
use crate::model::{ImageRecord, LazyLibrary};
use crate::policy::AnalysisConfig;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationOutcome {
    pub classified: Vec<RecordKey>,
    pub removed: Vec<RecordKey>,
}

/// Result of moving the LCP flag between records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LcpReassignment {
    pub previous: Option<RecordKey>,
    pub current: Option<RecordKey>,
    pub previous_host: Option<HostId>,
    pub current_host: Option<HostId>,
}

pub struct ClassificationSession {
    id: SessionId,
    page: PageSnapshot,
    signals: PageSignals,
    classifier: StrategyClassifier,
    registry: LibraryRegistry,
    counters: AggregateCounters,
    records: BTreeMap<RecordKey, ImageRecord>,
    hosts: HostIndex,
    lcp_candidate: Option<RecordKey>,
}

impl ClassificationSession {
    pub fn new(page: PageSnapshot, config: AnalysisConfig) -> Self {
        Self {
            id: SessionId::new(),
            signals: PageSignals::from_page(&page),
            page,
            classifier: StrategyClassifier::new(config),
            registry: LibraryRegistry::new(),
            counters: AggregateCounters::new(),
            records: BTreeMap::new(),
            hosts: HostIndex::new(),
            lcp_candidate: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn page(&self) -> &PageSnapshot {
        &self.page
    }

    /// Full rescan: registry, counters and records are rebuilt from the
    /// current page. The LCP candidate survives if its element still exists.
    pub fn scan(&mut self) -> usize {
        self.registry.clear();
        self.counters.clear();
        self.records.clear();
        if let Some(key) = self.lcp_candidate {
            if self.page.element(key.0).is_none() {
                self.lcp_candidate = None;
            }
        }
        let nodes: Vec<NodeId> = self.page.elements.iter().map(|el| el.node).collect();
        for node in &nodes {
            self.classify_node(*node);
        }
        metrics::record_scan();
        info!(
            target: "image-perceiver",
            session = %self.id.0,
            images = nodes.len(),
            "page scan complete"
        );
        nodes.len()
    }

    /// Swap in a fresh page snapshot and rescan.
    pub fn replace_page(&mut self, page: PageSnapshot) -> usize {
        self.signals = PageSignals::from_page(&page);
        self.page = page;
        self.scan()
    }

    /// Upsert `element` into the page and classify it.
    pub fn classify(&mut self, element: &ElementSnapshot) -> ImageRecord {
        self.page.apply(&MutationBatch {
            added: vec![element.clone()],
            removed: Vec::new(),
        });
        self.classify_element(element)
    }

    pub fn reclassify(&mut self, key: RecordKey) -> Result<ImageRecord, PerceiverError> {
        let element = self
            .page
            .element(key.0)
            .cloned()
            .ok_or(PerceiverError::UnknownElement(key.0))?;
        metrics::record_reclassification();
        Ok(self.classify_element(&element))
    }

    pub fn apply_mutations(&mut self, batch: &MutationBatch) -> MutationOutcome {
        self.page.apply(batch);
        let mut outcome = MutationOutcome::default();
        for node in &batch.removed {
            if batch.added.iter().any(|el| el.node == *node) {
                continue;
            }
            let key = RecordKey::from(*node);
            if self.records.remove(&key).is_some() {
                self.counters.remove(key);
                self.registry.unregister(key);
                self.hosts.unbind(key);
                if self.lcp_candidate == Some(key) {
                    self.lcp_candidate = None;
                }
                outcome.removed.push(key);
            }
        }
        for added in &batch.added {
            if let Some(record) = self.classify_node(added.node) {
                outcome.classified.push(record.key);
            }
        }
        metrics::record_mutation_batch();
        debug!(
            target: "image-perceiver",
            added = outcome.classified.len(),
            removed = outcome.removed.len(),
            "mutation batch applied"
        );
        outcome
    }

    /// Move the LCP flag. Only the previous and the new candidate are
    /// re-classified; the previous flag is cleared first.
    pub fn set_lcp_candidate(&mut self, key: Option<RecordKey>) -> LcpReassignment {
        let previous = self.lcp_candidate;
        let current = key.filter(|k| self.records.contains_key(k));
        let reassignment = LcpReassignment {
            previous,
            current,
            previous_host: previous.and_then(|k| self.hosts.host_for(k)),
            current_host: current.and_then(|k| self.hosts.host_for(k)),
        };
        if previous == current {
            return reassignment;
        }
        self.lcp_candidate = None;
        if let Some(old) = previous {
            if let Err(err) = self.reclassify(old) {
                warn!(target: "image-perceiver", key = %old, %err, "previous lcp record not re-classified");
            }
        }
        self.lcp_candidate = current;
        if let Some(new) = current {
            if let Err(err) = self.reclassify(new) {
                warn!(target: "image-perceiver", key = %new, %err, "lcp record not re-classified");
            }
        }
        reassignment
    }

    pub fn lcp_candidate(&self) -> Option<RecordKey> {
        self.lcp_candidate
    }

    pub fn record(&self, key: RecordKey) -> Option<&ImageRecord> {
        self.records.get(&key)
    }

    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.values()
    }

    pub fn element_kind(&self, node: NodeId) -> Option<ElementKind> {
        self.records.get(&RecordKey::from(node)).map(|r| r.kind)
    }

    pub fn counters(&self, lcp_value: Option<f64>) -> AggregateSnapshot {
        self.counters.snapshot(lcp_value)
    }

    pub fn library_registry(&self) -> BTreeMap<LazyLibrary, LibraryUsage> {
        self.registry.snapshot()
    }

    pub fn hosts(&self) -> &HostIndex {
        &self.hosts
    }

    pub fn bind_host(&self, key: RecordKey, host: HostId) -> Option<HostId> {
        self.hosts.bind(key, host)
    }

    pub fn export_records(&self) -> Vec<ExportRecord> {
        self.records.values().map(ExportRecord::from).collect()
    }

    fn classify_node(&mut self, node: NodeId) -> Option<ImageRecord> {
        let element = self.page.element(node)?.clone();
        Some(self.classify_element(&element))
    }

    fn classify_element(&mut self, element: &ElementSnapshot) -> ImageRecord {
        let ctx = ClassifyContext {
            page: &self.page,
            signals: &self.signals,
            lcp_candidate: self.lcp_candidate,
        };
        let record = self.classifier.classify(element, &ctx, &mut self.registry);
        self.counters.record(record.key, record.strategy);
        self.records.insert(record.key, record.clone());
        record
    }
}
