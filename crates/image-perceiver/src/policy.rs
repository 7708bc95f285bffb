use lazyscope_core_types::Size;
use serde::{Deserialize, Serialize};

/// Thresholds used by the optimisation analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub heavy_file_kb: f64,
    pub oversize_ratio: f64,
    pub webp_savings_pct: u8,
    pub hero_threshold: u8,
    pub hero_natural_min: Size,
    pub hero_display_min: Size,
    pub preload_min_width: f64,
    pub preload_min_height: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            heavy_file_kb: 500.0,
            oversize_ratio: 2.0,
            webp_savings_pct: 40,
            hero_threshold: 5,
            hero_natural_min: Size::new(800.0, 600.0),
            hero_display_min: Size::new(400.0, 300.0),
            preload_min_width: 800.0,
            preload_min_height: 600.0,
        }
    }
}
