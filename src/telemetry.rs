//! Tracing bootstrap and process-wide LCP counters.

use std::sync::atomic::{AtomicU64, Ordering};

use image_perceiver::metrics::{self as perceiver_metrics, MetricSnapshot};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static INIT: OnceCell<()> = OnceCell::new();

static LCP_TRANSITIONS: AtomicU64 = AtomicU64::new(0);
static LCP_FINALIZED: AtomicU64 = AtomicU64::new(0);
static FALLBACK_SELECTIONS: AtomicU64 = AtomicU64::new(0);
static FALLBACK_MISSES: AtomicU64 = AtomicU64::new(0);

/// Install the global subscriber once. `RUST_LOG` overrides `default_level`;
/// `json` switches the formatter to JSON lines.
pub fn init_tracing(default_level: &str, json: bool) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = Registry::default().with(filter);
        let _ = if json {
            tracing::subscriber::set_global_default(
                registry.with(fmt::layer().json().with_writer(std::io::stderr)),
            )
        } else {
            tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(std::io::stderr),
                ),
            )
        };
    });
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LcpCounters {
    pub transitions: u64,
    pub finalized: u64,
    pub fallback_selections: u64,
    pub fallback_misses: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetrySnapshot {
    pub perceiver: MetricSnapshot,
    pub lcp: LcpCounters,
}

pub fn record_lcp_transition() {
    LCP_TRANSITIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_lcp_finalized() {
    LCP_FINALIZED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_fallback(selected: bool) {
    if selected {
        FALLBACK_SELECTIONS.fetch_add(1, Ordering::Relaxed);
    } else {
        FALLBACK_MISSES.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        perceiver: perceiver_metrics::snapshot(),
        lcp: LcpCounters {
            transitions: LCP_TRANSITIONS.load(Ordering::Relaxed),
            finalized: LCP_FINALIZED.load(Ordering::Relaxed),
            fallback_selections: FALLBACK_SELECTIONS.load(Ordering::Relaxed),
            fallback_misses: FALLBACK_MISSES.load(Ordering::Relaxed),
        },
    }
}
