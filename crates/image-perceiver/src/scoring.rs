//! Record scoring.
//!
//! Two formulas exist on purpose and are not expected to agree:
//! [`display_score`] drives the overlay tier, [`export_performance_score`]
//! is the per-record figure in detailed exports.

use lazyscope_core_types::ElementKind;
use serde::{Deserialize, Serialize};

use crate::model::{Decoding, FetchPriority, ImageRecord, LoadingMode, Position};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreTier {
    Excellent,
    Good,
    NeedsWork,
    Poor,
}

impl ScoreTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => ScoreTier::Excellent,
            70..=89 => ScoreTier::Good,
            50..=69 => ScoreTier::NeedsWork,
            _ => ScoreTier::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreTier::Excellent => "excellent",
            ScoreTier::Good => "good",
            ScoreTier::NeedsWork => "needs-work",
            ScoreTier::Poor => "poor",
        }
    }
}

/// Inputs of the display score, all readable from a classified record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreInputs {
    pub kind: ElementKind,
    pub has_dimensions: bool,
    pub loading: LoadingMode,
    pub position: Position,
    pub is_lcp: bool,
    pub is_preloaded: bool,
    pub fetch_priority: FetchPriority,
    pub decoding: Decoding,
}

impl From<&ImageRecord> for ScoreInputs {
    fn from(record: &ImageRecord) -> Self {
        Self {
            kind: record.kind,
            has_dimensions: record.has_dimensions,
            loading: record.loading,
            position: record.position,
            is_lcp: record.is_lcp_candidate,
            is_preloaded: record.is_preloaded,
            fetch_priority: record.fetch_priority(),
            decoding: record.decoding(),
        }
    }
}

pub fn display_score(inputs: &ScoreInputs) -> u8 {
    let below_fold = inputs.position == Position::BelowFold;
    let mut score: i32 = 100;

    if !inputs.has_dimensions {
        score -= 20;
    }
    if inputs.loading == LoadingMode::Eager && below_fold {
        score -= 15;
    }
    if inputs.is_lcp && !inputs.is_preloaded {
        score -= 10;
    }
    if inputs.is_lcp && inputs.fetch_priority != FetchPriority::High {
        score -= 5;
    }
    // Decoding hints only exist on <img>.
    if inputs.kind == ElementKind::Img && inputs.decoding != Decoding::Async {
        score -= 5;
    }

    if inputs.loading == LoadingMode::Lazy && below_fold {
        score += 10;
    }
    if inputs.is_preloaded {
        score += 10;
    }
    if inputs.has_dimensions {
        score += 10;
    }

    score.clamp(0, 100) as u8
}

pub fn score_record(record: &ImageRecord) -> (u8, ScoreTier) {
    let score = display_score(&ScoreInputs::from(record));
    (score, ScoreTier::from_score(score))
}

/// Export figure: 100 minus ten per recommendation, with small bonuses.
pub fn export_performance_score(record: &ImageRecord) -> u8 {
    let mut score: i32 = 100 - 10 * record.recommendations.len() as i32;
    if record.is_preloaded {
        score += 5;
    }
    if record.fetch_priority() == FetchPriority::High {
        score += 5;
    }
    if record.format.is_modern() {
        score += 5;
    }
    score.clamp(0, 100) as u8
}
