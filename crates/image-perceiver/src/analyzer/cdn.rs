use serde::{Deserialize, Serialize};
use url::Url;

use super::AnalysisSubject;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CdnProvider {
    Cloudinary,
    Imgix,
    Cloudflare,
    Cloudfront,
    Akamai,
    Fastly,
    Shopify,
    Jetpack,
}

impl CdnProvider {
    pub fn label(&self) -> &'static str {
        match self {
            CdnProvider::Cloudinary => "Cloudinary",
            CdnProvider::Imgix => "imgix",
            CdnProvider::Cloudflare => "Cloudflare Images",
            CdnProvider::Cloudfront => "Amazon CloudFront",
            CdnProvider::Akamai => "Akamai Image Manager",
            CdnProvider::Fastly => "Fastly Image Optimizer",
            CdnProvider::Shopify => "Shopify CDN",
            CdnProvider::Jetpack => "Jetpack Photon",
        }
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            CdnProvider::Cloudinary => &["auto-format", "auto-quality", "resize", "responsive-breakpoints"],
            CdnProvider::Imgix => &["auto-format", "auto-compress", "resize"],
            CdnProvider::Cloudflare => &["auto-format", "resize", "polish"],
            CdnProvider::Cloudfront => &["edge-caching"],
            CdnProvider::Akamai => &["auto-format", "resize", "policy-based-quality"],
            CdnProvider::Fastly => &["auto-format", "resize", "quality"],
            CdnProvider::Shopify => &["auto-format", "resize"],
            CdnProvider::Jetpack => &["auto-format", "resize"],
        }
    }

    fn converts_formats(&self) -> bool {
        self.features().contains(&"auto-format")
    }
}

/// Hostname fragments of known image CDNs, matched in order.
const CDN_HOSTS: &[(&str, CdnProvider)] = &[
    ("res.cloudinary.com", CdnProvider::Cloudinary),
    ("cloudinary.com", CdnProvider::Cloudinary),
    ("imgix.net", CdnProvider::Imgix),
    ("imagedelivery.net", CdnProvider::Cloudflare),
    ("cloudfront.net", CdnProvider::Cloudfront),
    ("akamaized.net", CdnProvider::Akamai),
    ("akamaihd.net", CdnProvider::Akamai),
    ("fastly.net", CdnProvider::Fastly),
    ("cdn.shopify.com", CdnProvider::Shopify),
    ("wp.com", CdnProvider::Jetpack),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdnVerdict {
    pub provider: Option<CdnProvider>,
    pub features: Vec<String>,
    pub modern_format: bool,
}

impl CdnVerdict {
    pub fn recommendation(&self) -> Option<String> {
        let provider = self.provider?;
        if self.modern_format || !provider.converts_formats() {
            return None;
        }
        Some(format!(
            "Served from {}; enable its automatic format conversion",
            provider.label()
        ))
    }
}

pub fn detect_provider(source: &str) -> Option<CdnProvider> {
    let url = Url::parse(source).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    // Cloudflare image resizing rides on the site's own host.
    if url.path().starts_with("/cdn-cgi/image/") {
        return Some(CdnProvider::Cloudflare);
    }
    CDN_HOSTS
        .iter()
        .find(|(fragment, _)| host == *fragment || host.ends_with(&format!(".{fragment}")))
        .map(|(_, provider)| *provider)
}

pub fn check(subject: &AnalysisSubject<'_>) -> CdnVerdict {
    let provider = detect_provider(&subject.fingerprint.source);
    CdnVerdict {
        provider,
        features: provider
            .map(|p| p.features().iter().map(|f| f.to_string()).collect())
            .unwrap_or_default(),
        modern_format: subject.format.is_modern(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_hosts() {
        assert_eq!(
            detect_provider("https://res.cloudinary.com/demo/image/upload/a.jpg"),
            Some(CdnProvider::Cloudinary)
        );
        assert_eq!(
            detect_provider("https://assets.imgix.net/a.png"),
            Some(CdnProvider::Imgix)
        );
        assert_eq!(
            detect_provider("https://example.com/cdn-cgi/image/width=300/a.jpg"),
            Some(CdnProvider::Cloudflare)
        );
        assert_eq!(detect_provider("https://notimgix.net/a.png"), None);
        assert_eq!(detect_provider(""), None);
    }

    #[test]
    fn recommends_auto_format_for_legacy_formats() {
        let verdict = CdnVerdict {
            provider: Some(CdnProvider::Imgix),
            features: vec![],
            modern_format: false,
        };
        assert_eq!(
            verdict.recommendation().unwrap(),
            "Served from imgix; enable its automatic format conversion"
        );
        let modern = CdnVerdict {
            modern_format: true,
            ..verdict
        };
        assert!(modern.recommendation().is_none());
    }
}
