use lazyscope_core_types::Size;
use serde::{Deserialize, Serialize};

use crate::model::{ImageFormat, ImageRecord, LazyLibrary, LoadingMode, Position, Strategy};
use crate::scoring::{export_performance_score, ScoreTier};

/// Flattened per-record row for detailed exports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub source: String,
    pub strategy: Strategy,
    pub loading: LoadingMode,
    pub library: LazyLibrary,
    pub position: Position,
    pub natural: Size,
    pub display: Size,
    pub has_dimensions: bool,
    pub is_lcp_candidate: bool,
    pub is_preloaded: bool,
    pub format: ImageFormat,
    pub estimated_file_size_kb: Option<f64>,
    pub hero_score: u8,
    pub score: u8,
    pub score_tier: ScoreTier,
    pub performance_score: u8,
    pub recommendations: Vec<String>,
}

impl From<&ImageRecord> for ExportRecord {
    fn from(record: &ImageRecord) -> Self {
        Self {
            source: record.source.clone(),
            strategy: record.strategy,
            loading: record.loading,
            library: record.library,
            position: record.position,
            natural: record.natural,
            display: record.display,
            has_dimensions: record.has_dimensions,
            is_lcp_candidate: record.is_lcp_candidate,
            is_preloaded: record.is_preloaded,
            format: record.format,
            estimated_file_size_kb: record.estimated_file_size.kb(),
            hero_score: record.optimization.hero.score,
            score: record.score,
            score_tier: record.score_tier,
            performance_score: export_performance_score(record),
            recommendations: record.recommendations.clone(),
        }
    }
}
