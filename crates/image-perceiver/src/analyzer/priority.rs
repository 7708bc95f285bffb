use serde::{Deserialize, Serialize};

use super::AnalysisSubject;
use crate::model::{FetchPriority, Position};

pub const PRELOAD_HINT: &str =
    "Preload this large above-the-fold image with <link rel=\"preload\" as=\"image\">";
pub const LCP_FETCH_PRIORITY_HINT: &str = "Add fetchpriority=\"high\" to the LCP image";
const ABOVE_FOLD_FETCH_PRIORITY_HINT: &str =
    "Consider fetchpriority=\"high\" for this above-the-fold image";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchPriorityVerdict {
    pub current: FetchPriority,
    pub recommend_high: bool,
    pub for_lcp: bool,
}

impl FetchPriorityVerdict {
    pub fn recommendation(&self) -> Option<String> {
        if !self.recommend_high {
            return None;
        }
        Some(if self.for_lcp {
            LCP_FETCH_PRIORITY_HINT.to_string()
        } else {
            ABOVE_FOLD_FETCH_PRIORITY_HINT.to_string()
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreloadVerdict {
    pub recommend: bool,
}

impl PreloadVerdict {
    pub fn recommendation(&self) -> Option<String> {
        self.recommend.then(|| PRELOAD_HINT.to_string())
    }
}

pub fn check_fetch_priority(subject: &AnalysisSubject<'_>) -> FetchPriorityVerdict {
    let fp = subject.fingerprint;
    let current = fp.attributes.fetch_priority();
    let candidate = fp.position == Position::AboveFold || subject.is_lcp;
    FetchPriorityVerdict {
        current,
        recommend_high: candidate && current != FetchPriority::High,
        for_lcp: subject.is_lcp,
    }
}

/// The LCP element gets its own preload hint from the classifier.
pub fn check_preload(subject: &AnalysisSubject<'_>) -> PreloadVerdict {
    let fp = subject.fingerprint;
    let config = subject.config;
    let large = fp.natural.width >= config.preload_min_width
        || fp.natural.height >= config.preload_min_height;
    PreloadVerdict {
        recommend: fp.position == Position::AboveFold
            && large
            && !subject.is_preloaded
            && !subject.is_lcp,
    }
}
