use std::collections::BTreeMap;
use std::fmt;

use lazyscope_core_types::{ElementKind, NodeId, RecordKey, Size};
use serde::{Deserialize, Serialize};

use crate::analyzer::OptimizationReport;
use crate::scoring::ScoreTier;

/// Loading strategy label. Exactly one applies to a record per pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Unknown,
    Eager,
    Lazy,
    Preload,
    Lcp,
    Optimized,
    Issue,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Unknown,
        Strategy::Eager,
        Strategy::Lazy,
        Strategy::Preload,
        Strategy::Lcp,
        Strategy::Optimized,
        Strategy::Issue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Unknown => "unknown",
            Strategy::Eager => "eager",
            Strategy::Lazy => "lazy",
            Strategy::Preload => "preload",
            Strategy::Lcp => "lcp",
            Strategy::Optimized => "optimized",
            Strategy::Issue => "issue",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lazy-loading mechanism detected for an element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LazyLibrary {
    Native,
    Lazysizes,
    Lozad,
    ReactLazyLoad,
    VueLazyload,
    IntersectionObserver,
    Custom,
    None,
}

impl LazyLibrary {
    pub fn as_str(&self) -> &'static str {
        match self {
            LazyLibrary::Native => "native",
            LazyLibrary::Lazysizes => "lazysizes",
            LazyLibrary::Lozad => "lozad",
            LazyLibrary::ReactLazyLoad => "react-lazy-load",
            LazyLibrary::VueLazyload => "vue-lazyload",
            LazyLibrary::IntersectionObserver => "intersection-observer",
            LazyLibrary::Custom => "custom",
            LazyLibrary::None => "none",
        }
    }

    pub fn is_detected(&self) -> bool {
        !matches!(self, LazyLibrary::None)
    }
}

impl fmt::Display for LazyLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    AboveFold,
    BelowFold,
    Unknown,
}

/// How the browser fetches the element, independent of the final label.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingMode {
    Eager,
    Lazy,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPriority {
    High,
    Low,
    Auto,
}

impl FetchPriority {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => FetchPriority::High,
            Some("low") => FetchPriority::Low,
            _ => FetchPriority::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decoding {
    Async,
    Sync,
    Auto,
}

impl Decoding {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("async") => Decoding::Async,
            Some("sync") => Decoding::Sync,
            _ => Decoding::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Svg,
    Unknown,
}

impl ImageFormat {
    /// Sniff the format from the URL path extension or a data URI media type.
    pub fn from_source(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("data:image/") {
            let media = rest.split([';', ',']).next().unwrap_or_default();
            return Self::from_extension(media);
        }
        let path = lower.split(['?', '#']).next().unwrap_or_default();
        match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => Self::from_extension(ext),
            _ => ImageFormat::Unknown,
        }
    }

    fn from_extension(ext: &str) -> Self {
        match ext {
            "jpg" | "jpeg" | "jfif" | "pjpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "gif" => ImageFormat::Gif,
            "webp" => ImageFormat::Webp,
            "avif" => ImageFormat::Avif,
            "svg" | "svg+xml" => ImageFormat::Svg,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn is_modern(&self) -> bool {
        matches!(self, ImageFormat::Webp | ImageFormat::Avif)
    }

    /// Rough compressed bytes per pixel for photographic content.
    pub fn bytes_per_pixel(&self) -> f64 {
        match self {
            ImageFormat::Jpeg => 0.25,
            ImageFormat::Png => 1.0,
            ImageFormat::Gif => 0.5,
            ImageFormat::Webp => 0.15,
            ImageFormat::Avif => 0.1,
            ImageFormat::Svg => 0.02,
            ImageFormat::Unknown => 0.3,
        }
    }
}

/// Attribute subset relevant to classification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// Raw `loading` attribute, lowercased.
    pub loading: Option<String>,
    pub fetch_priority: Option<String>,
    pub decoding: Option<String>,
    pub has_srcset: bool,
    pub has_sizes: bool,
    pub in_picture: bool,
    pub classes: Vec<String>,
    /// Lazy-loading marker attributes present on the element.
    pub markers: BTreeMap<String, String>,
}

impl AttributeSnapshot {
    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    pub fn marker(&self, name: &str) -> Option<&str> {
        self.markers.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn native_lazy(&self) -> bool {
        self.loading.as_deref() == Some("lazy")
    }

    pub fn explicit_eager(&self) -> bool {
        self.loading.as_deref() == Some("eager")
    }

    pub fn fetch_priority(&self) -> FetchPriority {
        FetchPriority::parse(self.fetch_priority.as_deref())
    }

    pub fn decoding(&self) -> Decoding {
        Decoding::parse(self.decoding.as_deref())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "kb", rename_all = "kebab-case")]
pub enum FileSizeEstimate {
    /// Transfer size reported by resource timing.
    Measured(f64),
    /// Derived from natural dimensions and format.
    Estimated(f64),
    Unknown,
}

impl FileSizeEstimate {
    pub fn kb(&self) -> Option<f64> {
        match self {
            FileSizeEstimate::Measured(kb) | FileSizeEstimate::Estimated(kb) => Some(*kb),
            FileSizeEstimate::Unknown => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub key: RecordKey,
    pub node: NodeId,
    pub kind: ElementKind,
    pub source: String,
    pub declared: Size,
    pub natural: Size,
    pub display: Size,
    pub attributes: AttributeSnapshot,
    pub strategy: Strategy,
    pub loading: LoadingMode,
    pub library: LazyLibrary,
    pub position: Position,
    pub has_dimensions: bool,
    pub is_lcp_candidate: bool,
    pub is_preloaded: bool,
    pub format: ImageFormat,
    pub estimated_file_size: FileSizeEstimate,
    pub recommendations: Vec<String>,
    pub optimization: OptimizationReport,
    pub score: u8,
    pub score_tier: ScoreTier,
}

impl ImageRecord {
    pub fn fetch_priority(&self) -> FetchPriority {
        self.attributes.fetch_priority()
    }

    pub fn decoding(&self) -> Decoding {
        self.attributes.decoding()
    }
}
