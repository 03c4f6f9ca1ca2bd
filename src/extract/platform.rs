use std::sync::LazyLock;

use regex::Regex;

use crate::model::Platform;
use crate::patterns::{SAAS, STREAMING};

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://(?:www\.)?([^/\s?#]+)").unwrap());

/// Hostname of a URL, `www.` stripped. Returns `None` for non-URL input.
pub fn hostname(url: &str) -> Option<&str> {
    DOMAIN_RE.captures(url).map(|c| c.get(1).unwrap().as_str())
}

/// Platform identified from the URL alone. The domain check always wins over
/// any textual cue, so this runs before `detect_platform` consults the text.
pub fn from_url(url: &str) -> Option<Platform> {
    let lower = url.to_lowercase();
    let host = hostname(&lower)?;

    if host.contains("patreon.com") {
        return Some(Platform::Patreon);
    }
    if host.contains("tebex.io") {
        return Some(Platform::Tebex);
    }
    // Streaming entries may carry a path component (amazon.com/prime), so the
    // whole URL is checked, not just the host.
    if STREAMING.domains.iter().any(|d| lower.contains(d)) {
        return Some(Platform::Streaming);
    }
    if lower.contains("pricing") {
        return Some(Platform::Saas);
    }
    None
}

/// Classify the platform from URL and page text: known domains first, then
/// the literal "tebex" cue, then SaaS pricing-page cues, else Other.
pub fn detect_platform(url: &str, text: &str) -> Platform {
    if let Some(platform) = from_url(url) {
        return platform;
    }

    let lower = text.to_lowercase();
    if lower.contains("tebex") {
        return Platform::Tebex;
    }
    if lower.contains("pricing") || SAAS.tiers.iter().any(|t| lower.contains(t)) {
        return Platform::Saas;
    }
    Platform::Other
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_strips_www_and_path() {
        assert_eq!(hostname("https://www.netflix.com/account"), Some("netflix.com"));
        assert_eq!(hostname("http://tebex.io"), Some("tebex.io"));
        assert_eq!(hostname("not a url"), None);
    }

    #[test]
    fn known_domains() {
        assert_eq!(from_url("https://www.patreon.com/somecreator"), Some(Platform::Patreon));
        assert_eq!(from_url("https://store.tebex.io/checkout"), Some(Platform::Tebex));
        assert_eq!(from_url("https://www.netflix.com/signup"), Some(Platform::Streaming));
        assert_eq!(from_url("https://www.amazon.com/prime/offers"), Some(Platform::Streaming));
    }

    #[test]
    fn domain_beats_keyword() {
        // Page text screams tebex but the domain is Patreon: domain wins.
        let p = detect_platform("https://patreon.com/x", "buy a tebex rank today");
        assert_eq!(p, Platform::Patreon);
    }

    #[test]
    fn pricing_url_is_saas() {
        assert_eq!(from_url("https://example.com/pricing"), Some(Platform::Saas));
    }

    #[test]
    fn saas_tier_cue_in_text() {
        let p = detect_platform("https://example.com/", "Upgrade to the Enterprise tier");
        assert_eq!(p, Platform::Saas);
    }

    #[test]
    fn tebex_text_cue() {
        let p = detect_platform("https://mc-shop.example/", "powered by Tebex");
        assert_eq!(p, Platform::Tebex);
    }

    #[test]
    fn fallback_is_other() {
        assert_eq!(detect_platform("https://example.com/", "a quiet page"), Platform::Other);
    }
}
