//! Independent optimisation checks.
//!
//! Each check reads the fingerprint and the shared [`AnalysisSubject`] and
//! returns its own verdict. [`OptimizationReport::recommendations`] joins
//! them in a fixed order.

pub mod cdn;
pub mod dimensions;
pub mod file_size;
pub mod format;
pub mod hero;
pub mod priority;
pub mod responsive;

use lazyscope_core_types::Viewport;
use serde::{Deserialize, Serialize};

use crate::fingerprint::ImageFingerprint;
use crate::model::{FileSizeEstimate, ImageFormat};
use crate::policy::AnalysisConfig;

pub use cdn::{CdnProvider, CdnVerdict};
pub use dimensions::DimensionsVerdict;
pub use file_size::FileSizeVerdict;
pub use format::FormatVerdict;
pub use hero::HeroVerdict;
pub use priority::{FetchPriorityVerdict, PreloadVerdict};
pub use responsive::ResponsiveVerdict;

/// Facts shared by all checks for one element.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisSubject<'a> {
    pub fingerprint: &'a ImageFingerprint,
    pub format: ImageFormat,
    pub estimate: FileSizeEstimate,
    pub viewport: Viewport,
    pub is_lcp: bool,
    pub is_preloaded: bool,
    pub config: &'a AnalysisConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub dimensions: DimensionsVerdict,
    pub format: FormatVerdict,
    pub responsive: ResponsiveVerdict,
    pub file_size: FileSizeVerdict,
    pub cdn: CdnVerdict,
    pub hero: HeroVerdict,
    pub fetch_priority: FetchPriorityVerdict,
    pub preload: PreloadVerdict,
}

impl OptimizationReport {
    pub fn recommendations(&self) -> Vec<String> {
        [
            self.dimensions.recommendation(),
            self.format.recommendation(),
            self.responsive.recommendation(),
            self.file_size.recommendation(),
            self.cdn.recommendation(),
            self.hero.recommendation(),
            self.fetch_priority.recommendation(),
            self.preload.recommendation(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub fn analyze(subject: &AnalysisSubject<'_>) -> OptimizationReport {
    OptimizationReport {
        dimensions: dimensions::check(subject),
        format: format::check(subject),
        responsive: responsive::check(subject),
        file_size: file_size::check(subject),
        cdn: cdn::check(subject),
        hero: hero::check(subject),
        fetch_priority: priority::check_fetch_priority(subject),
        preload: priority::check_preload(subject),
    }
}
