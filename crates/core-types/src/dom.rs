//! DOM-like snapshot model handed to the engine by its collaborators.
//!
//! Nothing here talks to a live document: a content-side bridge serialises
//! the elements it sees into these structures and the engine classifies
//! them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::geometry::{Rect, Size, Viewport};
use crate::NodeId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    /// Native `<img>` element.
    Img,
    /// `<image>` inside an SVG document fragment.
    SvgImage,
    /// Any element painting a CSS `background-image`.
    Background,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub node: NodeId,
    pub kind: ElementKind,
    /// Raw `src` (or `href` for SVG images) attribute.
    #[serde(default)]
    pub src: Option<String>,
    /// `currentSrc` as reported by the browser, when it differs from `src`.
    #[serde(default)]
    pub current_src: Option<String>,
    /// Computed `background-image` value, e.g. `url("hero.jpg")`.
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub natural: Size,
    /// `None` when the element is detached and has no layout box.
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ElementSnapshot {
    pub fn new(node: NodeId, kind: ElementKind) -> Self {
        Self {
            node,
            kind,
            src: None,
            current_src: None,
            background_image: None,
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            natural: Size::ZERO,
            rect: None,
            visible: true,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_natural(mut self, width: f64, height: f64) -> Self {
        self.natural = Size::new(width, height);
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect::new(x, y, width, height));
        self
    }

    pub fn with_background(mut self, value: impl Into<String>) -> Self {
        self.background_image = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// `navigator.connection.effectiveType`: `slow-2g`, `2g`, `3g` or `4g`.
    #[serde(default)]
    pub effective_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether the page exposes largest-contentful-paint entries.
    pub paint_timing: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { paint_timing: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<ElementSnapshot>,
    /// Image URLs referenced by `<link rel="preload" as="image">`.
    #[serde(default)]
    pub preloaded_images: BTreeSet<String>,
    /// Names of globals defined on the page's window object.
    #[serde(default)]
    pub globals: BTreeSet<String>,
    /// Inline script bodies, used for observer inference.
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub network: Option<NetworkInfo>,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Transfer sizes in bytes reported by resource timing, keyed by URL.
    #[serde(default)]
    pub resource_timings: BTreeMap<String, u64>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            url: url.into(),
            viewport,
            ..Self::default()
        }
    }

    /// Resolve `raw` against the page URL. Unresolvable input is returned
    /// unchanged.
    pub fn resolve_url(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("data:") {
            return raw.to_string();
        }
        match Url::parse(&self.url).and_then(|base| base.join(raw)) {
            Ok(url) => url.to_string(),
            Err(_) => raw.to_string(),
        }
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementSnapshot> {
        self.elements.iter().find(|el| el.node == node)
    }

    pub fn is_preloaded(&self, resolved: &str) -> bool {
        !resolved.is_empty()
            && self
                .preloaded_images
                .iter()
                .any(|href| self.resolve_url(href) == resolved)
    }

    pub fn effective_type(&self) -> Option<&str> {
        self.network
            .as_ref()
            .and_then(|info| info.effective_type.as_deref())
    }

    /// Replace or insert elements, then drop removed nodes.
    pub fn apply(&mut self, batch: &MutationBatch) {
        // Removals first: a node both removed and added in one batch was moved.
        if !batch.removed.is_empty() {
            self.elements
                .retain(|el| !batch.removed.contains(&el.node));
        }
        for added in &batch.added {
            match self.elements.iter_mut().find(|el| el.node == added.node) {
                Some(existing) => *existing = added.clone(),
                None => self.elements.push(added.clone()),
            }
        }
    }
}

/// Structural change notification from the page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationBatch {
    #[serde(default)]
    pub added: Vec<ElementSnapshot>,
    #[serde(default)]
    pub removed: Vec<NodeId>,
}
