use std::collections::{BTreeMap, HashMap};

use lazyscope_core_types::RecordKey;
use serde::{Deserialize, Serialize};

use crate::model::Strategy;

/// Running per-strategy tally. Each record sits in exactly one bucket.
#[derive(Debug, Default)]
pub struct AggregateCounters {
    buckets: BTreeMap<Strategy, u32>,
    assigned: HashMap<RecordKey, Strategy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub total: u32,
    pub lazy: u32,
    pub eager: u32,
    pub optimized: u32,
    pub issues: u32,
    pub lcp_candidates: u32,
    pub lcp_value: Option<f64>,
    pub preloaded: u32,
    pub unknown: u32,
}

impl AggregateSnapshot {
    pub fn bucket_sum(&self) -> u32 {
        self.lazy
            + self.eager
            + self.optimized
            + self.issues
            + self.lcp_candidates
            + self.preloaded
            + self.unknown
    }
}

impl AggregateCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `key` into the bucket for `strategy`, returning its previous bucket.
    pub fn record(&mut self, key: RecordKey, strategy: Strategy) -> Option<Strategy> {
        let previous = self.assigned.insert(key, strategy);
        if previous == Some(strategy) {
            return previous;
        }
        if let Some(old) = previous {
            self.decrement(old);
        }
        *self.buckets.entry(strategy).or_insert(0) += 1;
        previous
    }

    pub fn remove(&mut self, key: RecordKey) -> Option<Strategy> {
        let previous = self.assigned.remove(&key)?;
        self.decrement(previous);
        Some(previous)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.assigned.clear();
    }

    pub fn total(&self) -> u32 {
        self.assigned.len() as u32
    }

    pub fn count(&self, strategy: Strategy) -> u32 {
        self.buckets.get(&strategy).copied().unwrap_or(0)
    }

    pub fn snapshot(&self, lcp_value: Option<f64>) -> AggregateSnapshot {
        AggregateSnapshot {
            total: self.total(),
            lazy: self.count(Strategy::Lazy),
            eager: self.count(Strategy::Eager),
            optimized: self.count(Strategy::Optimized),
            issues: self.count(Strategy::Issue),
            lcp_candidates: self.count(Strategy::Lcp),
            lcp_value,
            preloaded: self.count(Strategy::Preload),
            unknown: self.count(Strategy::Unknown),
        }
    }

    fn decrement(&mut self, strategy: Strategy) {
        if let Some(count) = self.buckets.get_mut(&strategy) {
            *count = count.saturating_sub(1);
        }
    }
}
