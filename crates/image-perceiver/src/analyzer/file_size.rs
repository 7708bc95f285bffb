use lazyscope_core_types::PageSnapshot;
use serde::{Deserialize, Serialize};

use super::AnalysisSubject;
use crate::fingerprint::ImageFingerprint;
use crate::model::{FileSizeEstimate, ImageFormat};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileSizeVerdict {
    pub oversized: bool,
    pub heavy: bool,
    pub oversize_ratio: Option<f64>,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub estimate: FileSizeEstimate,
}

impl FileSizeVerdict {
    pub fn recommendation(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.oversized {
            let ratio = self.oversize_ratio.unwrap_or_default();
            match (self.target_width, self.target_height) {
                (Some(w), Some(h)) => parts.push(format!(
                    "Image is {ratio:.1}x larger than displayed; resize to about {w}x{h}"
                )),
                _ => parts.push(format!("Image is {ratio:.1}x larger than displayed; resize it")),
            }
        }
        if self.heavy {
            if let Some(kb) = self.estimate.kb() {
                parts.push(format!("File is about {kb:.0} KB; compress it or serve a smaller rendition"));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(". "))
        }
    }
}

/// Transfer size from resource timing when the page reported one, otherwise a
/// guess from natural pixels and format.
pub fn estimate(
    fingerprint: &ImageFingerprint,
    format: ImageFormat,
    page: &PageSnapshot,
) -> FileSizeEstimate {
    if let Some(bytes) = page
        .resource_timings
        .get(&fingerprint.source)
        .copied()
        .filter(|bytes| *bytes > 0)
    {
        return FileSizeEstimate::Measured(round_tenth(bytes as f64 / 1024.0));
    }
    if fingerprint.natural.is_known() {
        let bytes = fingerprint.natural.area() * format.bytes_per_pixel();
        return FileSizeEstimate::Estimated(round_tenth(bytes / 1024.0));
    }
    FileSizeEstimate::Unknown
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn check(subject: &AnalysisSubject<'_>) -> FileSizeVerdict {
    let fp = subject.fingerprint;
    let ratio = (fp.natural.is_known() && fp.display.is_known()).then(|| {
        let ratio = (fp.natural.width / fp.display.width).max(fp.natural.height / fp.display.height);
        round_tenth(ratio)
    });
    let oversized = ratio.map_or(false, |r| r > subject.config.oversize_ratio);
    let dpr = subject.viewport.device_pixel_ratio.max(1.0);
    let heavy = subject
        .estimate
        .kb()
        .map_or(false, |kb| kb > subject.config.heavy_file_kb);

    FileSizeVerdict {
        oversized,
        heavy,
        oversize_ratio: ratio,
        target_width: oversized.then(|| (fp.display.width * dpr).round() as u32),
        target_height: oversized.then(|| (fp.display.height * dpr).round() as u32),
        estimate: subject.estimate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::testing::{fp, img, page};
    use crate::policy::AnalysisConfig;

    #[test]
    fn measured_size_wins_over_estimate() {
        let mut page = page();
        page.resource_timings
            .insert("https://site.test/a.jpg".into(), 204_800);
        let fingerprint = fp(&img("a.jpg").with_natural(1000.0, 1000.0));
        assert_eq!(
            estimate(&fingerprint, ImageFormat::Jpeg, &page),
            FileSizeEstimate::Measured(200.0)
        );
    }

    #[test]
    fn estimate_from_pixels_and_format() {
        let fingerprint = fp(&img("a.jpg").with_natural(1000.0, 1000.0));
        assert_eq!(
            estimate(&fingerprint, ImageFormat::Jpeg, &page()),
            FileSizeEstimate::Estimated(244.1)
        );
        let unknown = fp(&img("a.jpg"));
        assert_eq!(
            estimate(&unknown, ImageFormat::Jpeg, &page()),
            FileSizeEstimate::Unknown
        );
    }

    #[test]
    fn flags_oversized_and_heavy() {
        let fingerprint = fp(&img("a.png")
            .with_natural(2400.0, 1600.0)
            .with_rect(0.0, 0.0, 600.0, 400.0));
        let config = AnalysisConfig::default();
        let verdict = check(&AnalysisSubject {
            fingerprint: &fingerprint,
            format: ImageFormat::Png,
            estimate: FileSizeEstimate::Estimated(3750.0),
            viewport: Default::default(),
            is_lcp: false,
            is_preloaded: false,
            config: &config,
        });
        assert!(verdict.oversized);
        assert!(verdict.heavy);
        assert_eq!(verdict.oversize_ratio, Some(4.0));
        assert_eq!(verdict.target_width, Some(600));
        let text = verdict.recommendation().unwrap();
        assert!(text.contains("4.0x larger"));
        assert!(text.contains("3750 KB"));
    }

    #[test]
    fn exactly_double_is_not_oversized() {
        let fingerprint = fp(&img("a.jpg")
            .with_natural(800.0, 600.0)
            .with_rect(0.0, 0.0, 400.0, 300.0));
        let config = AnalysisConfig::default();
        let verdict = check(&AnalysisSubject {
            fingerprint: &fingerprint,
            format: ImageFormat::Jpeg,
            estimate: FileSizeEstimate::Unknown,
            viewport: Default::default(),
            is_lcp: false,
            is_preloaded: false,
            config: &config,
        });
        assert!(!verdict.oversized);
        assert!(verdict.recommendation().is_none());
    }
}
