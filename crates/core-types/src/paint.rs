use serde::{Deserialize, Serialize};

use crate::NodeId;

/// A largest-contentful-paint entry as reported by the page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PaintEntry {
    /// Painted element, when the browser exposes one.
    #[serde(default)]
    pub node: Option<NodeId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub render_time_ms: f64,
    #[serde(default)]
    pub load_time_ms: f64,
    /// Painted area in CSS pixels.
    #[serde(default)]
    pub size: f64,
}

impl PaintEntry {
    pub fn for_node(node: NodeId, render_time_ms: f64) -> Self {
        Self {
            node: Some(node),
            render_time_ms,
            ..Self::default()
        }
    }

    /// Cross-origin images without timing headers report a zero render time;
    /// the load time is the best remaining signal.
    pub fn value_ms(&self) -> f64 {
        if self.render_time_ms > 0.0 {
            self.render_time_ms
        } else {
            self.load_time_ms.max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_falls_back_to_load_time() {
        let entry = PaintEntry {
            load_time_ms: 900.0,
            ..PaintEntry::default()
        };
        assert_eq!(entry.value_ms(), 900.0);
        assert_eq!(PaintEntry::for_node(NodeId(1), 1200.0).value_ms(), 1200.0);
    }
}
