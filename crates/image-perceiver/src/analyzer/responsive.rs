use lazyscope_core_types::ElementKind;
use serde::{Deserialize, Serialize};

use super::AnalysisSubject;
use crate::model::ImageFormat;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponsiveVerdict {
    pub has_srcset: bool,
    pub has_sizes: bool,
    pub missing: bool,
    pub high_density: bool,
    pub device_pixel_ratio: f64,
}

impl ResponsiveVerdict {
    pub fn recommendation(&self) -> Option<String> {
        if !self.missing {
            return None;
        }
        Some(if self.high_density {
            format!(
                "Add srcset with {}x candidates for high-density displays",
                self.device_pixel_ratio.ceil() as u32
            )
        } else {
            "Add srcset and sizes so the browser can choose an appropriately sized source"
                .to_string()
        })
    }
}

pub fn check(subject: &AnalysisSubject<'_>) -> ResponsiveVerdict {
    let fp = subject.fingerprint;
    let attrs = &fp.attributes;
    let dpr = subject.viewport.device_pixel_ratio;
    // Vector images and CSS backgrounds have no srcset mechanism to add.
    let applicable = fp.kind == ElementKind::Img && subject.format != ImageFormat::Svg;
    let has_mechanism = attrs.has_srcset || attrs.in_picture;
    ResponsiveVerdict {
        has_srcset: attrs.has_srcset,
        has_sizes: attrs.has_sizes,
        missing: applicable && !has_mechanism,
        high_density: dpr > 1.0,
        device_pixel_ratio: dpr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::testing::{fp, img};
    use crate::model::FileSizeEstimate;
    use crate::policy::AnalysisConfig;
    use lazyscope_core_types::Viewport;

    fn verdict(el: lazyscope_core_types::ElementSnapshot, dpr: f64) -> ResponsiveVerdict {
        let fingerprint = fp(&el);
        let config = AnalysisConfig::default();
        check(&AnalysisSubject {
            fingerprint: &fingerprint,
            format: ImageFormat::Jpeg,
            estimate: FileSizeEstimate::Unknown,
            viewport: Viewport {
                device_pixel_ratio: dpr,
                ..Viewport::default()
            },
            is_lcp: false,
            is_preloaded: false,
            config: &config,
        })
    }

    #[test]
    fn high_density_displays_get_explicit_hint() {
        let v = verdict(img("a.jpg"), 2.0);
        assert!(v.missing);
        assert_eq!(
            v.recommendation().unwrap(),
            "Add srcset with 2x candidates for high-density displays"
        );
    }

    #[test]
    fn srcset_satisfies_check() {
        let v = verdict(img("a.jpg").with_attr("srcset", "a-1x.jpg 1x, a-2x.jpg 2x"), 2.0);
        assert!(!v.missing);
        assert!(v.recommendation().is_none());
    }
}
