//! Stable classification input derived from an element snapshot.

use std::collections::BTreeMap;

use lazyscope_core_types::{ElementKind, ElementSnapshot, PageSnapshot, Rect, RecordKey, Size};
use serde::{Deserialize, Serialize};

use crate::model::{AttributeSnapshot, Position};

/// Attributes that lazy-loading libraries use to park the real source.
pub const MARKER_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-srcset",
    "data-sizes",
    "data-original",
    "data-lazy",
    "data-lazy-src",
    "data-bg",
    "data-background",
    "data-expand",
    "data-loaded",
    "lazy",
];

const DEFERRED_SOURCE_ATTRIBUTES: &[&str] = &["data-src", "data-original", "data-lazy", "data-lazy-src"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageFingerprint {
    pub key: RecordKey,
    pub kind: ElementKind,
    pub source: String,
    pub declared: Size,
    pub natural: Size,
    pub display: Size,
    pub rect: Option<Rect>,
    pub visible: bool,
    pub position: Position,
    pub has_dimensions: bool,
    /// The element currently shows a placeholder while its real source waits
    /// in a data attribute.
    pub deferred_source: bool,
    pub attributes: AttributeSnapshot,
}

pub fn fingerprint(element: &ElementSnapshot, page: &PageSnapshot) -> ImageFingerprint {
    let attributes = snapshot_attributes(element);
    let (source, deferred_source) = resolve_source(element, page);

    let width_attr = element.attr("width").and_then(parse_length);
    let height_attr = element.attr("height").and_then(parse_length);
    let style = element.attr("style").map(parse_inline_style).unwrap_or_default();
    let declared = Size::new(
        width_attr.or(style.width).unwrap_or(0.0),
        height_attr.or(style.height).unwrap_or(0.0),
    );
    let width_declared = width_attr.is_some() || style.width_supplied;
    let height_declared = height_attr.is_some() || style.height_supplied;

    let rect = element.rect;
    let has_dimensions = match (rect, element.kind) {
        (None, _) => false,
        // Background boxes are sized by CSS; their layout never depends on the image.
        (Some(_), ElementKind::Background) => true,
        (Some(_), _) => width_declared && height_declared,
    };

    let position = match rect {
        Some(rect)
            if rect.top() < page.viewport.height
                && (rect.top() >= 0.0 || rect.top() + rect.height > 0.0) =>
        {
            Position::AboveFold
        }
        Some(_) => Position::BelowFold,
        None => Position::Unknown,
    };

    ImageFingerprint {
        key: RecordKey::from(element.node),
        kind: element.kind,
        source,
        declared,
        natural: element.natural,
        display: rect.map(|r| r.size()).unwrap_or(Size::ZERO),
        rect,
        visible: element.visible,
        position,
        has_dimensions,
        deferred_source,
        attributes,
    }
}

fn snapshot_attributes(element: &ElementSnapshot) -> AttributeSnapshot {
    let lowered = |name: &str| element.attr(name).map(|v| v.trim().to_ascii_lowercase());
    let markers: BTreeMap<String, String> = MARKER_ATTRIBUTES
        .iter()
        .filter_map(|name| element.attr(name).map(|v| (name.to_string(), v.to_string())))
        .collect();
    AttributeSnapshot {
        loading: lowered("loading"),
        fetch_priority: lowered("fetchpriority"),
        decoding: lowered("decoding"),
        has_srcset: element.attr("srcset").map_or(false, |v| !v.trim().is_empty())
            || element.has_attr("data-srcset"),
        has_sizes: element.has_attr("sizes") || element.has_attr("data-sizes"),
        in_picture: element.has_attr("data-in-picture"),
        classes: element.classes.clone(),
        markers,
    }
}

fn resolve_source(element: &ElementSnapshot, page: &PageSnapshot) -> (String, bool) {
    let raw = match element.kind {
        ElementKind::Background => element
            .background_image
            .as_deref()
            .and_then(extract_css_url)
            .map(str::to_string),
        ElementKind::SvgImage => [
            element.current_src.as_deref(),
            element.src.as_deref(),
            element.attr("href"),
            element.attr("xlink:href"),
        ]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(str::to_string),
        ElementKind::Img => [element.current_src.as_deref(), element.src.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty() && !is_placeholder(v))
            .map(str::to_string),
    };

    if let Some(raw) = raw {
        return (page.resolve_url(&raw), false);
    }

    let deferred = DEFERRED_SOURCE_ATTRIBUTES
        .iter()
        .find_map(|name| element.attr(name).filter(|v| !v.trim().is_empty()));
    match deferred {
        Some(raw) => (page.resolve_url(raw), true),
        None => {
            let placeholder = element.src.as_deref().unwrap_or_default();
            (page.resolve_url(placeholder), false)
        }
    }
}

fn is_placeholder(src: &str) -> bool {
    let src = src.trim();
    src.starts_with("data:") && src.len() < 256
}

/// Pull the first `url(...)` argument out of a CSS background value.
pub fn extract_css_url(value: &str) -> Option<&str> {
    let start = value.find("url(")? + 4;
    let rest = &value[start..];
    let end = rest.find(')')?;
    let inner = rest[..end].trim().trim_matches(|c| c == '"' || c == '\'');
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

fn parse_length(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let numeric = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    numeric.parse::<f64>().ok().filter(|v| *v > 0.0)
}

#[derive(Default)]
struct InlineDimensions {
    width: Option<f64>,
    height: Option<f64>,
    width_supplied: bool,
    height_supplied: bool,
}

fn parse_inline_style(style: &str) -> InlineDimensions {
    let mut dims = InlineDimensions::default();
    for decl in style.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim();
        let supplied = !value.is_empty() && !value.eq_ignore_ascii_case("auto");
        match prop.trim().to_ascii_lowercase().as_str() {
            "width" => {
                dims.width = parse_length(value);
                dims.width_supplied = supplied;
            }
            "height" => {
                dims.height = parse_length(value);
                dims.height_supplied = supplied;
            }
            _ => {}
        }
    }
    dims
}
