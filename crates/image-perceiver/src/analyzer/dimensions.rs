use serde::{Deserialize, Serialize};

use super::AnalysisSubject;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimensionsVerdict {
    pub missing: bool,
    pub suggested_width: Option<u32>,
    pub suggested_height: Option<u32>,
    pub aspect_ratio: Option<f64>,
}

impl DimensionsVerdict {
    pub fn recommendation(&self) -> Option<String> {
        if !self.missing {
            return None;
        }
        Some(match (self.suggested_width, self.suggested_height) {
            (Some(w), Some(h)) => format!(
                "Add width=\"{w}\" and height=\"{h}\" attributes to reserve space and prevent layout shift"
            ),
            _ => "Add explicit width and height attributes to prevent layout shift".to_string(),
        })
    }
}

pub fn check(subject: &AnalysisSubject<'_>) -> DimensionsVerdict {
    let fp = subject.fingerprint;
    let source = if fp.display.is_known() {
        Some(fp.display)
    } else if fp.natural.is_known() {
        Some(fp.natural)
    } else {
        None
    };
    let aspect_ratio = fp
        .natural
        .is_known()
        .then(|| (fp.natural.width / fp.natural.height * 1000.0).round() / 1000.0);

    DimensionsVerdict {
        missing: !fp.has_dimensions,
        suggested_width: source.map(|s| s.width.round() as u32),
        suggested_height: source.map(|s| s.height.round() as u32),
        aspect_ratio,
    }
}
