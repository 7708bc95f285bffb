use serde::{Deserialize, Serialize};

use super::priority::PRELOAD_HINT;
use super::AnalysisSubject;
use crate::model::{FetchPriority, Position};

pub const ABOVE_FOLD_WEIGHT: u8 = 3;
pub const LARGE_NATURAL_WEIGHT: u8 = 2;
pub const LARGE_DISPLAY_WEIGHT: u8 = 2;
pub const HIGH_PRIORITY_WEIGHT: u8 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeroVerdict {
    pub score: u8,
    pub is_hero: bool,
    pub factors: Vec<String>,
    pub preload_eligible: bool,
}

impl HeroVerdict {
    pub fn recommendation(&self) -> Option<String> {
        self.preload_eligible.then(|| PRELOAD_HINT.to_string())
    }
}

pub fn check(subject: &AnalysisSubject<'_>) -> HeroVerdict {
    let fp = subject.fingerprint;
    let config = subject.config;
    let weights = [
        (
            fp.position == Position::AboveFold,
            ABOVE_FOLD_WEIGHT,
            "above-fold",
        ),
        (
            fp.natural.width >= config.hero_natural_min.width
                && fp.natural.height >= config.hero_natural_min.height,
            LARGE_NATURAL_WEIGHT,
            "large-natural-size",
        ),
        (
            fp.display.width >= config.hero_display_min.width
                && fp.display.height >= config.hero_display_min.height,
            LARGE_DISPLAY_WEIGHT,
            "large-display-size",
        ),
        (
            fp.attributes.fetch_priority() == FetchPriority::High,
            HIGH_PRIORITY_WEIGHT,
            "high-fetch-priority",
        ),
    ];

    let mut score = 0u8;
    let mut factors = Vec::new();
    for (hit, weight, label) in weights {
        if hit {
            score += weight;
            factors.push(label.to_string());
        }
    }
    let is_hero = score >= config.hero_threshold;
    HeroVerdict {
        score,
        is_hero,
        factors,
        preload_eligible: is_hero && !subject.is_preloaded && !subject.is_lcp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::testing::{fp, img};
    use crate::model::{FileSizeEstimate, ImageFormat};
    use crate::policy::AnalysisConfig;

    fn hero(top: f64, high_priority: bool) -> HeroVerdict {
        let mut el = img("hero.jpg")
            .with_natural(1000.0, 800.0)
            .with_rect(0.0, top, 500.0, 400.0);
        if high_priority {
            el = el.with_attr("fetchpriority", "high");
        }
        let fingerprint = fp(&el);
        let config = AnalysisConfig::default();
        check(&AnalysisSubject {
            fingerprint: &fingerprint,
            format: ImageFormat::Jpeg,
            estimate: FileSizeEstimate::Unknown,
            viewport: Default::default(),
            is_lcp: false,
            is_preloaded: false,
            config: &config,
        })
    }

    #[test]
    fn above_fold_high_priority_scores_eight() {
        let v = hero(50.0, true);
        assert_eq!(v.score, 8);
        assert!(v.is_hero);
        assert_eq!(v.recommendation().as_deref(), Some(PRELOAD_HINT));
    }

    #[test]
    fn below_fold_high_priority_scores_five() {
        let v = hero(2000.0, true);
        assert_eq!(v.score, 5);
        assert!(v.is_hero);
    }

    #[test]
    fn below_fold_without_priority_scores_four() {
        let v = hero(2000.0, false);
        assert_eq!(v.score, 4);
        assert!(!v.is_hero);
        assert!(v.recommendation().is_none());
    }
}
