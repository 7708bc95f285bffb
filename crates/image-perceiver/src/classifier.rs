//! Strategy classification.
//!
//! Precedence, evaluated fresh on every pass:
//! 1. active LCP candidate -> `lcp`
//! 2. preloaded source -> `preload`
//! 3. lazy (library or native) below the fold with dimensions -> `optimized`
//! 4. missing dimensions, more than two core recommendations, or lazy above
//!    the fold -> `issue`
//! 5. otherwise the loading mode itself (`lazy` / `eager`)

use std::time::Instant;

use lazyscope_core_types::{ElementKind, ElementSnapshot, PageSnapshot, RecordKey};
use tracing::debug;

use crate::analyzer::priority::LCP_FETCH_PRIORITY_HINT;
use crate::analyzer::{self, file_size, AnalysisSubject};
use crate::fingerprint::{fingerprint, ImageFingerprint};
use crate::library::{LibraryPatternMatcher, LibraryRegistry, PageSignals};
use crate::metrics;
use crate::model::{
    Decoding, FetchPriority, ImageFormat, ImageRecord, LoadingMode, Position,
    Strategy,
};
use crate::policy::AnalysisConfig;
use crate::scoring::{self, ScoreTier};

pub const LAZY_ABOVE_FOLD_ISSUE: &str =
    "Above-the-fold image is lazy loaded; load it eagerly so it does not delay rendering";
pub const EAGER_BELOW_FOLD_HINT: &str =
    "Below-the-fold image loads eagerly; add loading=\"lazy\"";
pub const LCP_PRELOAD_HINT: &str =
    "Preload the LCP image with <link rel=\"preload\" as=\"image\">";
pub const ASYNC_DECODE_HINT: &str = "Add decoding=\"async\" to keep decoding off the main thread";

/// Core recommendations beyond this count turn a record into an issue.
const ISSUE_RECOMMENDATION_LIMIT: usize = 2;

/// Per-pass inputs shared by every element of a page.
#[derive(Clone, Copy, Debug)]
pub struct ClassifyContext<'a> {
    pub page: &'a PageSnapshot,
    pub signals: &'a PageSignals,
    pub lcp_candidate: Option<RecordKey>,
}

pub struct StrategyClassifier {
    matcher: LibraryPatternMatcher,
    config: AnalysisConfig,
}

impl StrategyClassifier {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_matcher(LibraryPatternMatcher::default(), config)
    }

    pub fn with_matcher(matcher: LibraryPatternMatcher, config: AnalysisConfig) -> Self {
        Self { matcher, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn matcher(&self) -> &LibraryPatternMatcher {
        &self.matcher
    }

    /// Build the complete record for `element`. Library usage is recorded in
    /// `registry`; nothing else is mutated.
    pub fn classify(
        &self,
        element: &ElementSnapshot,
        ctx: &ClassifyContext<'_>,
        registry: &mut LibraryRegistry,
    ) -> ImageRecord {
        let started = Instant::now();
        let fp = fingerprint(element, ctx.page);
        let is_lcp = ctx.lcp_candidate == Some(fp.key);
        let is_preloaded = ctx.page.is_preloaded(&fp.source);

        let library = self.matcher.detect_and_register(
            fp.key,
            &fp.attributes,
            fp.deferred_source,
            ctx.signals,
            registry,
        );
        let loading = if library.is_detected() || fp.attributes.native_lazy() {
            LoadingMode::Lazy
        } else {
            LoadingMode::Eager
        };

        let format = ImageFormat::from_source(&fp.source);
        let estimate = file_size::estimate(&fp, format, ctx.page);
        let optimization = analyzer::analyze(&AnalysisSubject {
            fingerprint: &fp,
            format,
            estimate,
            viewport: ctx.page.viewport,
            is_lcp,
            is_preloaded,
            config: &self.config,
        });

        let mut recommendations = Vec::new();
        if !fp.has_dimensions {
            if let Some(hint) = optimization.dimensions.recommendation() {
                recommendations.push(hint);
            }
        }
        let lazy_above_fold =
            loading == LoadingMode::Lazy && fp.position == Position::AboveFold;
        if lazy_above_fold {
            recommendations.push(LAZY_ABOVE_FOLD_ISSUE.to_string());
        }
        if loading == LoadingMode::Eager && fp.position == Position::BelowFold {
            recommendations.push(EAGER_BELOW_FOLD_HINT.to_string());
        }
        if is_lcp && !is_preloaded {
            recommendations.push(LCP_PRELOAD_HINT.to_string());
        }
        if is_lcp && fp.attributes.fetch_priority() != FetchPriority::High {
            recommendations.push(LCP_FETCH_PRIORITY_HINT.to_string());
        }
        if fp.kind == ElementKind::Img && fp.attributes.decoding() != Decoding::Async {
            recommendations.push(ASYNC_DECODE_HINT.to_string());
        }
        let core_count = recommendations.len();

        for extra in optimization.recommendations() {
            if !recommendations.contains(&extra) {
                recommendations.push(extra);
            }
        }

        let strategy = select_strategy(&fp, is_lcp, is_preloaded, loading, core_count, lazy_above_fold);

        let mut record = ImageRecord {
            key: fp.key,
            node: element.node,
            kind: fp.kind,
            source: fp.source.clone(),
            declared: fp.declared,
            natural: fp.natural,
            display: fp.display,
            attributes: fp.attributes.clone(),
            strategy,
            loading,
            library,
            position: fp.position,
            has_dimensions: fp.has_dimensions,
            is_lcp_candidate: is_lcp,
            is_preloaded,
            format,
            estimated_file_size: estimate,
            recommendations,
            optimization,
            score: 0,
            score_tier: ScoreTier::Poor,
        };
        let (score, tier) = scoring::score_record(&record);
        record.score = score;
        record.score_tier = tier;

        debug!(
            target: "image-perceiver",
            key = %record.key,
            strategy = %record.strategy,
            library = %record.library,
            score = record.score,
            "classified image"
        );
        metrics::record_classification(started.elapsed());
        record
    }
}

fn select_strategy(
    fp: &ImageFingerprint,
    is_lcp: bool,
    is_preloaded: bool,
    loading: LoadingMode,
    core_count: usize,
    lazy_above_fold: bool,
) -> Strategy {
    if is_lcp {
        return Strategy::Lcp;
    }
    if is_preloaded {
        return Strategy::Preload;
    }
    if fp.source.is_empty() {
        return Strategy::Unknown;
    }
    if loading == LoadingMode::Lazy && fp.position == Position::BelowFold && fp.has_dimensions {
        return Strategy::Optimized;
    }
    if !fp.has_dimensions || core_count > ISSUE_RECOMMENDATION_LIMIT || lazy_above_fold {
        return Strategy::Issue;
    }
    match loading {
        LoadingMode::Lazy => Strategy::Lazy,
        LoadingMode::Eager => Strategy::Eager,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LazyLibrary;
    use lazyscope_core_types::{NodeId, Viewport};

    fn page() -> PageSnapshot {
        PageSnapshot::new("https://news.test/", Viewport::default())
    }

    fn classify_on(page: &PageSnapshot, el: &ElementSnapshot, lcp: Option<RecordKey>) -> ImageRecord {
        let classifier = StrategyClassifier::new(AnalysisConfig::default());
        let signals = PageSignals::from_page(page);
        let mut registry = LibraryRegistry::new();
        classifier.classify(
            el,
            &ClassifyContext {
                page,
                signals: &signals,
                lcp_candidate: lcp,
            },
            &mut registry,
        )
    }

    fn sized(node: u64, top: f64) -> ElementSnapshot {
        ElementSnapshot::new(NodeId(node), ElementKind::Img)
            .with_src("/img/photo.webp")
            .with_attr("width", "400")
            .with_attr("height", "300")
            .with_attr("decoding", "async")
            .with_attr("srcset", "/img/photo.webp 1x")
            .with_natural(400.0, 300.0)
            .with_rect(0.0, top, 400.0, 300.0)
    }

    #[test]
    fn native_lazy_below_fold_with_dimensions_is_optimized() {
        let el = sized(1, 2000.0).with_attr("loading", "lazy");
        let record = classify_on(&page(), &el, None);
        assert_eq!(record.library, LazyLibrary::Native);
        assert_eq!(record.strategy, Strategy::Optimized);
        assert!(record.recommendations.is_empty());
    }

    #[test]
    fn lazy_above_fold_is_an_issue() {
        let el = sized(1, 10.0).with_attr("loading", "lazy");
        let record = classify_on(&page(), &el, None);
        assert_eq!(record.strategy, Strategy::Issue);
        assert_eq!(record.recommendations[0], LAZY_ABOVE_FOLD_ISSUE);
    }

    #[test]
    fn library_forces_lazy_despite_attribute() {
        let el = sized(1, 2000.0)
            .with_attr("loading", "eager")
            .with_class("lazyload")
            .with_attr("data-src", "/img/photo.webp");
        let record = classify_on(&page(), &el, None);
        assert_eq!(record.library, LazyLibrary::Lazysizes);
        assert_eq!(record.loading, LoadingMode::Lazy);
        assert_eq!(record.strategy, Strategy::Optimized);
    }

    #[test]
    fn eager_above_fold_with_dimensions_stays_eager() {
        let record = classify_on(&page(), &sized(1, 10.0), None);
        assert_eq!(record.strategy, Strategy::Eager);
    }

    #[test]
    fn eager_below_fold_is_never_optimized() {
        let record = classify_on(&page(), &sized(1, 2000.0), None);
        assert_eq!(record.strategy, Strategy::Eager);
        assert_eq!(record.recommendations, vec![EAGER_BELOW_FOLD_HINT.to_string()]);
    }

    #[test]
    fn lcp_and_preload_take_precedence() {
        let mut page = page();
        page.preloaded_images.insert("/img/photo.webp".into());
        let el = sized(1, 10.0);
        assert_eq!(classify_on(&page, &el, None).strategy, Strategy::Preload);
        let lcp = classify_on(&page, &el, Some(RecordKey(NodeId(1))));
        assert_eq!(lcp.strategy, Strategy::Lcp);
        assert!(lcp.is_lcp_candidate);
        assert!(lcp.recommendations.contains(&LCP_FETCH_PRIORITY_HINT.to_string()));
        assert!(!lcp.recommendations.contains(&LCP_PRELOAD_HINT.to_string()));
    }

    #[test]
    fn core_recommendations_come_first_in_fixed_order() {
        let el = ElementSnapshot::new(NodeId(4), ElementKind::Img)
            .with_src("/big.jpg")
            .with_natural(2400.0, 1600.0)
            .with_rect(0.0, 2400.0, 600.0, 400.0);
        let record = classify_on(&page(), &el, None);
        assert_eq!(record.strategy, Strategy::Issue);
        assert!(record.recommendations[0].starts_with("Add width=\"600\""));
        assert_eq!(record.recommendations[1], EAGER_BELOW_FOLD_HINT);
        assert_eq!(record.recommendations[2], ASYNC_DECODE_HINT);
        assert!(record.recommendations[3].starts_with("Serve WebP instead of JPEG"));
        assert!(record.recommendations[4].starts_with("Add srcset"));
        assert!(record.recommendations[5].starts_with("Image is 4.0x larger"));
    }

    #[test]
    fn classification_is_idempotent() {
        let el = sized(9, 10.0).with_class("lozad").with_attr("data-src", "/x.jpg");
        let page = page();
        assert_eq!(classify_on(&page, &el, None), classify_on(&page, &el, None));
    }

    #[test]
    fn detached_element_degrades_quietly() {
        let el = ElementSnapshot::new(NodeId(5), ElementKind::Img).with_src("/a.png");
        let record = classify_on(&page(), &el, None);
        assert_eq!(record.position, Position::Unknown);
        assert!(!record.has_dimensions);
        assert_eq!(record.strategy, Strategy::Issue);
    }

    #[test]
    fn unresolvable_background_is_unknown() {
        let el = ElementSnapshot::new(NodeId(6), ElementKind::Background)
            .with_background("none")
            .with_rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(classify_on(&page(), &el, None).strategy, Strategy::Unknown);
    }
}
