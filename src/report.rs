//! Inspection report assembled from an engine snapshot.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use image_perceiver::{AggregateSnapshot, ExportRecord, LazyLibrary, LibraryUsage};
use lcp_tracker::{LcpElementType, LcpOrigin, LcpPhase, LcpState};
use serde::Serialize;

use crate::engine::ImageEngine;
use crate::telemetry::{self, TelemetrySnapshot};

#[derive(Clone, Debug, Serialize)]
pub struct LcpSummary {
    pub phase: LcpPhase,
    pub value_ms: Option<f64>,
    pub element_type: Option<LcpElementType>,
    pub origin: Option<LcpOrigin>,
    pub url: Option<String>,
}

impl From<&LcpState> for LcpSummary {
    fn from(state: &LcpState) -> Self {
        Self {
            phase: state.phase,
            value_ms: state.value_ms,
            element_type: state.element_type,
            origin: state.origin,
            url: state.url.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InspectionReport {
    pub url: String,
    pub counters: AggregateSnapshot,
    pub lcp: LcpSummary,
    pub libraries: BTreeMap<LazyLibrary, LibraryUsage>,
    pub images: Vec<ExportRecord>,
    pub telemetry: TelemetrySnapshot,
}

impl InspectionReport {
    pub fn collect(engine: &ImageEngine, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            counters: engine.aggregate_counters(),
            lcp: LcpSummary::from(&engine.lcp_state()),
            libraries: engine.library_registry(),
            images: engine.export_records(),
            telemetry: telemetry::snapshot(),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let c = &self.counters;
        let _ = writeln!(out, "Page: {}", self.url);
        let _ = writeln!(
            out,
            "Images: {} total | {} lazy | {} eager | {} optimized | {} issues | {} preloaded | {} lcp",
            c.total, c.lazy, c.eager, c.optimized, c.issues, c.preloaded, c.lcp_candidates
        );
        match self.lcp.value_ms {
            Some(value) => {
                let _ = writeln!(
                    out,
                    "LCP: {:.0} ms ({:?}, {:?}){}",
                    value,
                    self.lcp.phase,
                    self.lcp.origin,
                    self.lcp
                        .url
                        .as_deref()
                        .map(|url| format!(" {url}"))
                        .unwrap_or_default()
                );
            }
            None => {
                let _ = writeln!(out, "LCP: no lcp image detected");
            }
        }
        for (library, usage) in &self.libraries {
            let _ = writeln!(out, "Library {}: {} element(s)", library.as_str(), usage.usage_count);
        }
        for image in &self.images {
            let _ = writeln!(
                out,
                "- [{}] {} {:?} (score {} {}, perf {})",
                image.strategy.as_str(),
                image.source,
                image.format,
                image.score,
                image.score_tier.as_str(),
                image.performance_score
            );
            for rec in &image.recommendations {
                let _ = writeln!(out, "    * {rec}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use lazyscope_core_types::{ElementKind, ElementSnapshot, NodeId, PageSnapshot, Viewport};

    #[test]
    fn summary_lists_every_image() {
        let mut page = PageSnapshot::new("https://news.test/", Viewport::default());
        page.elements = vec![
            ElementSnapshot::new(NodeId(1), ElementKind::Img)
                .with_src("/a.jpg")
                .with_rect(0.0, 0.0, 200.0, 100.0),
            ElementSnapshot::new(NodeId(2), ElementKind::Img)
                .with_src("/b.png")
                .with_attr("loading", "lazy")
                .with_rect(0.0, 2000.0, 200.0, 100.0),
        ];
        let engine = ImageEngine::new(EngineConfig::default());
        engine.activate(page);

        let report = InspectionReport::collect(&engine, "https://news.test/");
        let text = report.summary();
        assert_eq!(report.images.len(), 2);
        assert!(text.contains("Images: 2 total"));
        assert!(text.contains("https://news.test/a.jpg"));
        assert!(text.contains("LCP: no lcp image detected"));

        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["counters"]["total"], 2);
        assert!(json["lcp"]["value_ms"].is_null());
    }
}
