use serde::{Deserialize, Serialize};

use super::AnalysisSubject;
use crate::model::ImageFormat;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormatVerdict {
    pub current: ImageFormat,
    pub suggested: Option<ImageFormat>,
    pub savings_pct: Option<u8>,
    pub estimated_savings_kb: Option<f64>,
}

impl FormatVerdict {
    pub fn recommendation(&self) -> Option<String> {
        let suggested = self.suggested?;
        let pct = self.savings_pct.unwrap_or_default();
        let from = format_label(self.current);
        let to = format_label(suggested);
        Some(match self.estimated_savings_kb {
            Some(kb) => format!(
                "Serve {to} instead of {from} (about {pct}% smaller, roughly {kb:.0} KB saved)"
            ),
            None => format!("Serve {to} instead of {from} (about {pct}% smaller)"),
        })
    }
}

fn format_label(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Png => "PNG",
        ImageFormat::Gif => "GIF",
        ImageFormat::Webp => "WebP",
        ImageFormat::Avif => "AVIF",
        ImageFormat::Svg => "SVG",
        ImageFormat::Unknown => "the current format",
    }
}

pub fn check(subject: &AnalysisSubject<'_>) -> FormatVerdict {
    let current = subject.format;
    if !matches!(current, ImageFormat::Jpeg | ImageFormat::Png) {
        return FormatVerdict {
            current,
            suggested: None,
            savings_pct: None,
            estimated_savings_kb: None,
        };
    }
    let pct = subject.config.webp_savings_pct;
    let estimated_savings_kb = subject
        .estimate
        .kb()
        .map(|kb| (kb * f64::from(pct) / 100.0 * 10.0).round() / 10.0);
    FormatVerdict {
        current,
        suggested: Some(ImageFormat::Webp),
        savings_pct: Some(pct),
        estimated_savings_kb,
    }
}
