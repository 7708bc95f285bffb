//! Lazy-loading library detection.
//!
//! Rules are evaluated in full against an element's attribute snapshot; the
//! match with the lowest priority rank wins and equal ranks resolve to the
//! first-declared rule. Rank order of the default table:
//!
//! 0. LazySizes classes and attributes
//! 1. library-specific markers (lozad class, react-lazy-load wrappers, vue-lazyload `lazy`)
//! 2. generic `data-src` / `data-srcset` (lozad)
//! 3. native `loading="lazy"`
//! 4. generic lazy class names and source attributes (custom)
//! 5. IntersectionObserver inferred from page scripts
//!
//! When no DOM rule matches, well-known window globals are consulted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use lazyscope_core_types::{PageSnapshot, RecordKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{AttributeSnapshot, LazyLibrary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RulePredicate {
    Class(&'static str),
    Attr(&'static str),
    NativeLazy,
    /// Page scripts construct an IntersectionObserver and the element parks
    /// its source in a data attribute.
    ObserverScript,
}

#[derive(Clone, Copy, Debug)]
pub struct LibraryRule {
    pub library: LazyLibrary,
    pub predicate: RulePredicate,
    pub priority: u8,
}

const fn rule(library: LazyLibrary, predicate: RulePredicate, priority: u8) -> LibraryRule {
    LibraryRule {
        library,
        predicate,
        priority,
    }
}

pub const DEFAULT_RULES: &[LibraryRule] = &[
    rule(LazyLibrary::Lazysizes, RulePredicate::Class("lazyload"), 0),
    rule(LazyLibrary::Lazysizes, RulePredicate::Class("lazyloading"), 0),
    rule(LazyLibrary::Lazysizes, RulePredicate::Class("lazyloaded"), 0),
    rule(LazyLibrary::Lazysizes, RulePredicate::Class("lazypreload"), 0),
    rule(LazyLibrary::Lazysizes, RulePredicate::Attr("data-sizes"), 0),
    rule(LazyLibrary::Lazysizes, RulePredicate::Attr("data-expand"), 0),
    rule(LazyLibrary::Lozad, RulePredicate::Class("lozad"), 1),
    rule(LazyLibrary::ReactLazyLoad, RulePredicate::Class("lazy-load-image-background"), 1),
    rule(LazyLibrary::ReactLazyLoad, RulePredicate::Class("lazyload-wrapper"), 1),
    rule(LazyLibrary::VueLazyload, RulePredicate::Attr("lazy"), 1),
    rule(LazyLibrary::Lozad, RulePredicate::Attr("data-src"), 2),
    rule(LazyLibrary::Lozad, RulePredicate::Attr("data-srcset"), 2),
    rule(LazyLibrary::Native, RulePredicate::NativeLazy, 3),
    rule(LazyLibrary::Custom, RulePredicate::Class("lazy"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Class("lazy-load"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Class("js-lazy"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Class("b-lazy"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Attr("data-original"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Attr("data-lazy"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Attr("data-lazy-src"), 4),
    rule(LazyLibrary::Custom, RulePredicate::Attr("data-bg"), 4),
    rule(LazyLibrary::IntersectionObserver, RulePredicate::ObserverScript, 5),
];

/// Window globals installed by known libraries.
pub const GLOBAL_MARKERS: &[(&str, LazyLibrary)] = &[
    ("lazySizes", LazyLibrary::Lazysizes),
    ("lazySizesConfig", LazyLibrary::Lazysizes),
    ("lozad", LazyLibrary::Lozad),
    ("VueLazyload", LazyLibrary::VueLazyload),
    ("LazyLoad", LazyLibrary::Custom),
];

/// Page-level facts the matcher needs beyond the element itself.
#[derive(Clone, Debug, Default)]
pub struct PageSignals {
    pub globals: BTreeSet<String>,
    pub observer_script: bool,
}

impl PageSignals {
    pub fn from_page(page: &PageSnapshot) -> Self {
        Self {
            globals: page.globals.clone(),
            observer_script: page
                .scripts
                .iter()
                .any(|body| body.contains("IntersectionObserver")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOrigin {
    Dom { rule_index: usize, priority: u8 },
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibraryMatch {
    pub library: LazyLibrary,
    pub origin: MatchOrigin,
}

pub struct LibraryPatternMatcher {
    rules: Vec<LibraryRule>,
}

impl Default for LibraryPatternMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl LibraryPatternMatcher {
    pub fn new(rules: Vec<LibraryRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[LibraryRule] {
        &self.rules
    }

    pub fn detect(
        &self,
        attrs: &AttributeSnapshot,
        deferred_source: bool,
        signals: &PageSignals,
    ) -> Option<LibraryMatch> {
        let best = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| Self::matches(rule.predicate, attrs, deferred_source, signals))
            .min_by_key(|(index, rule)| (rule.priority, *index));

        if let Some((rule_index, rule)) = best {
            return Some(LibraryMatch {
                library: rule.library,
                origin: MatchOrigin::Dom {
                    rule_index,
                    priority: rule.priority,
                },
            });
        }

        if attrs.explicit_eager() {
            return None;
        }
        GLOBAL_MARKERS
            .iter()
            .find(|(global, _)| signals.globals.contains(*global))
            .map(|(_, library)| LibraryMatch {
                library: *library,
                origin: MatchOrigin::Global,
            })
    }

    /// Detect and record the match for `key` in the page registry.
    pub fn detect_and_register(
        &self,
        key: RecordKey,
        attrs: &AttributeSnapshot,
        deferred_source: bool,
        signals: &PageSignals,
        registry: &mut LibraryRegistry,
    ) -> LazyLibrary {
        match self.detect(attrs, deferred_source, signals) {
            Some(found) => {
                debug!(target: "image-perceiver", %key, library = %found.library, origin = ?found.origin, "library matched");
                registry.register(key, found.library);
                found.library
            }
            None => {
                registry.unregister(key);
                LazyLibrary::None
            }
        }
    }

    fn matches(
        predicate: RulePredicate,
        attrs: &AttributeSnapshot,
        deferred_source: bool,
        signals: &PageSignals,
    ) -> bool {
        match predicate {
            RulePredicate::Class(class) => attrs.has_class(class),
            RulePredicate::Attr(name) => attrs.has_marker(name),
            RulePredicate::NativeLazy => attrs.native_lazy(),
            RulePredicate::ObserverScript => signals.observer_script && deferred_source,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LibraryUsage {
    pub detected: bool,
    pub usage_count: u32,
    pub recommendations: Vec<String>,
}

/// Libraries observed on the page and how many records use each.
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    usage: BTreeMap<LazyLibrary, LibraryUsage>,
    assignments: HashMap<RecordKey, LazyLibrary>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` uses `library`. Re-registering the same pair is a
    /// no-op; a changed library moves the usage.
    pub fn register(&mut self, key: RecordKey, library: LazyLibrary) {
        if !library.is_detected() {
            self.unregister(key);
            return;
        }
        match self.assignments.insert(key, library) {
            Some(previous) if previous == library => return,
            Some(previous) => self.decrement(previous),
            None => {}
        }
        let entry = self.usage.entry(library).or_insert_with(|| LibraryUsage {
            detected: true,
            usage_count: 0,
            recommendations: library_recommendations(library),
        });
        entry.usage_count += 1;
    }

    pub fn unregister(&mut self, key: RecordKey) {
        if let Some(previous) = self.assignments.remove(&key) {
            self.decrement(previous);
        }
    }

    pub fn clear(&mut self) {
        self.usage.clear();
        self.assignments.clear();
    }

    pub fn get(&self, library: LazyLibrary) -> Option<&LibraryUsage> {
        self.usage.get(&library)
    }

    pub fn snapshot(&self) -> BTreeMap<LazyLibrary, LibraryUsage> {
        self.usage.clone()
    }

    fn decrement(&mut self, library: LazyLibrary) {
        // Detected stays set: the library was observed on this page.
        if let Some(entry) = self.usage.get_mut(&library) {
            entry.usage_count = entry.usage_count.saturating_sub(1);
        }
    }
}

fn library_recommendations(library: LazyLibrary) -> Vec<String> {
    let items: &[&str] = match library {
        LazyLibrary::Native => &[
            "Native lazy loading in use; keep loading=\"lazy\" off above-the-fold images",
        ],
        LazyLibrary::Lazysizes => &[
            "Enable the lazysizes native-loading plugin so supporting browsers use loading=\"lazy\"",
            "Use data-sizes=\"auto\" so lazysizes computes the sizes attribute",
        ],
        LazyLibrary::Lozad => &[
            "Give lozad images explicit width and height so the swapped-in source does not shift layout",
        ],
        LazyLibrary::ReactLazyLoad => &[
            "Prefer loading=\"lazy\" on plain <img> elements where the wrapper adds no placeholder",
        ],
        LazyLibrary::VueLazyload => &[
            "Configure a lightweight loading placeholder and a preLoad ratio in vue-lazyload",
        ],
        LazyLibrary::IntersectionObserver => &[
            "Add a rootMargin to the IntersectionObserver so images start loading before they scroll into view",
        ],
        LazyLibrary::Custom => &[
            "Custom lazy-loading script detected; native loading=\"lazy\" removes the script dependency",
        ],
        LazyLibrary::None => &[],
    };
    items.iter().map(|s| s.to_string()).collect()
}
