//! Fallback LCP selection when paint timing is missing or silent.

use lazyscope_core_types::{RecordKey, Size};
use serde::{Deserialize, Serialize};

use crate::config::LcpConfig;
use crate::state::LcpElementType;

/// Size assumed for images whose transfer size cannot be estimated.
const DEFAULT_ESTIMATE_KB: f64 = 100.0;
/// Estimates above this weight get a heavier time budget.
const LARGE_ESTIMATE_KB: f64 = 500.0;
const LARGE_PENALTY: f64 = 1.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeuristicCandidate {
    pub key: RecordKey,
    pub element_type: LcpElementType,
    pub display: Size,
    pub above_fold: bool,
    pub visible: bool,
    pub estimated_kb: Option<f64>,
    pub url: Option<String>,
}

impl HeuristicCandidate {
    pub fn qualifies(&self, config: &LcpConfig) -> bool {
        self.above_fold
            && self.visible
            && self.display.width >= config.min_width
            && self.display.height >= config.min_height
            && self.display.area() >= config.min_area
    }
}

/// Largest qualifying candidate by displayed area; ties go to the earliest.
pub fn select<'a>(
    candidates: &'a [HeuristicCandidate],
    config: &LcpConfig,
) -> Option<&'a HeuristicCandidate> {
    candidates
        .iter()
        .filter(|c| c.qualifies(config))
        .fold(None, |best: Option<&HeuristicCandidate>, c| match best {
            Some(b) if b.display.area() >= c.display.area() => Some(b),
            _ => Some(c),
        })
}

/// Connection profile: (round-trip latency ms, throughput KB/s).
fn connection_profile(effective_type: Option<&str>) -> (f64, f64) {
    match effective_type {
        Some("slow-2g") => (2_000.0, 5.0),
        Some("2g") => (1_200.0, 30.0),
        Some("3g") => (400.0, 180.0),
        _ => (100.0, 1_200.0),
    }
}

/// Synthetic paint time for a heuristic candidate.
pub fn synthetic_timing_ms(estimated_kb: Option<f64>, effective_type: Option<&str>) -> f64 {
    let (latency, throughput) = connection_profile(effective_type);
    let kb = estimated_kb.filter(|kb| *kb > 0.0).unwrap_or(DEFAULT_ESTIMATE_KB);
    let mut transfer = kb / throughput * 1_000.0;
    if kb > LARGE_ESTIMATE_KB {
        transfer *= LARGE_PENALTY;
    }
    (latency + transfer).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyscope_core_types::NodeId;

    fn candidate(node: u64, w: f64, h: f64, above_fold: bool) -> HeuristicCandidate {
        HeuristicCandidate {
            key: RecordKey(NodeId(node)),
            element_type: LcpElementType::Image,
            display: Size::new(w, h),
            above_fold,
            visible: true,
            estimated_kb: None,
            url: None,
        }
    }

    #[test]
    fn picks_largest_qualifying_area() {
        let config = LcpConfig::default();
        let list = vec![
            candidate(1, 400.0, 300.0, true),
            candidate(2, 1200.0, 600.0, false),
            candidate(3, 800.0, 400.0, true),
            candidate(4, 800.0, 400.0, true),
        ];
        assert_eq!(select(&list, &config).unwrap().key, RecordKey(NodeId(3)));
    }

    #[test]
    fn small_or_thin_elements_never_qualify() {
        let config = LcpConfig::default();
        let list = vec![
            candidate(1, 299.0, 400.0, true),
            candidate(2, 300.0, 199.0, true),
        ];
        assert!(select(&list, &config).is_none());
        assert!(select(&[], &config).is_none());

        let exact = vec![candidate(3, 300.0, 200.0, true)];
        assert!(select(&exact, &config).is_some());
        let strict = LcpConfig {
            min_area: 100_000.0,
            ..LcpConfig::default()
        };
        assert!(select(&exact, &strict).is_none());
    }

    #[test]
    fn slow_connections_and_heavy_files_cost_more() {
        assert_eq!(synthetic_timing_ms(Some(120.0), Some("4g")), 200.0);
        assert_eq!(synthetic_timing_ms(None, None), 183.0);
        assert_eq!(synthetic_timing_ms(Some(900.0), Some("3g")), 7_900.0);
        assert!(synthetic_timing_ms(Some(120.0), Some("2g")) > synthetic_timing_ms(Some(120.0), Some("4g")));
    }
}
