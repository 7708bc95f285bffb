//! Telemetry helpers for image classification.
//!
//! Lightweight counters + latency aggregates so the CLI can surface basic
//! numbers without an external metrics backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static CLASSIFY_TOTAL: AtomicU64 = AtomicU64::new(0);
static CLASSIFY_LAT_NS: AtomicU64 = AtomicU64::new(0);
static CLASSIFY_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);

static SCAN_TOTAL: AtomicU64 = AtomicU64::new(0);
static MUTATION_BATCHES: AtomicU64 = AtomicU64::new(0);
static RECLASSIFY_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    pub classify: MetricCounter,
    pub scans: u64,
    pub mutation_batches: u64,
    pub reclassifications: u64,
}

pub fn record_classification(duration: Duration) {
    CLASSIFY_TOTAL.fetch_add(1, Ordering::Relaxed);
    CLASSIFY_LAT_NS.fetch_add(duration_to_nanos(duration), Ordering::Relaxed);
    CLASSIFY_LAT_SAMPLES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_scan() {
    SCAN_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_mutation_batch() {
    MUTATION_BATCHES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reclassification() {
    RECLASSIFY_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricSnapshot {
    let samples = CLASSIFY_LAT_SAMPLES.load(Ordering::Relaxed);
    let nanos = CLASSIFY_LAT_NS.load(Ordering::Relaxed);
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (nanos as f64 / samples as f64) / 1_000_000.0
    };
    MetricSnapshot {
        classify: MetricCounter {
            total: CLASSIFY_TOTAL.load(Ordering::Relaxed),
            avg_ms,
        },
        scans: SCAN_TOTAL.load(Ordering::Relaxed),
        mutation_batches: MUTATION_BATCHES.load(Ordering::Relaxed),
        reclassifications: RECLASSIFY_TOTAL.load(Ordering::Relaxed),
    }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    let nanos = duration.as_nanos();
    if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    }
}
