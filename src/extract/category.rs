use crate::model::{Category, Platform};
use crate::patterns::STREAMING;

const MUSIC_CUES: &[&str] = &["music", "audio", "spotify", "soundcloud"];
const GAMING_CUES: &[&str] = &["game", "gaming"];
const CLOUD_CUES: &[&str] = &["cloud", "storage", "backup"];
const PRODUCTIVITY_CUES: &[&str] = &["productivity", "business", "work"];
const SOFTWARE_CUES: &[&str] = &["software", "app"];

/// Ordered decision list: streaming → music → gaming → cloud → productivity
/// → software → other. The first matching family wins and nothing is
/// re-evaluated afterwards, so identical input always yields the identical
/// category.
pub fn categorize(platform: Platform, text: &str) -> Category {
    let lower = text.to_lowercase();
    let has = |cues: &[&str]| cues.iter().any(|c| lower.contains(c));

    if platform == Platform::Streaming || has(STREAMING.keywords) {
        return Category::Streaming;
    }
    if has(MUSIC_CUES) {
        return Category::Music;
    }
    if platform == Platform::Tebex || has(GAMING_CUES) {
        return Category::Gaming;
    }
    if has(CLOUD_CUES) {
        return Category::Cloud;
    }
    if has(PRODUCTIVITY_CUES) {
        return Category::Productivity;
    }
    if platform == Platform::Saas || has(SOFTWARE_CUES) {
        return Category::Software;
    }
    Category::Other
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_streaming_wins_immediately() {
        let c = categorize(Platform::Streaming, "software for business work");
        assert_eq!(c, Category::Streaming);
    }

    #[test]
    fn first_family_wins_on_adversarial_text() {
        // Contains both a music cue and a gaming cue: music is checked first.
        let c = categorize(Platform::Other, "game soundtracks and music downloads");
        assert_eq!(c, Category::Music);
    }

    #[test]
    fn streaming_keyword_beats_music_keyword() {
        let c = categorize(Platform::Other, "watch music documentaries");
        assert_eq!(c, Category::Streaming);
    }

    #[test]
    fn tebex_platform_is_gaming() {
        assert_eq!(categorize(Platform::Tebex, "server rank"), Category::Gaming);
    }

    #[test]
    fn saas_platform_falls_through_to_software() {
        assert_eq!(categorize(Platform::Saas, "team plan"), Category::Software);
    }

    #[test]
    fn deterministic_and_idempotent() {
        let text = "cloud backup for your photos";
        let first = categorize(Platform::Other, text);
        let second = categorize(Platform::Other, text);
        assert_eq!(first, Category::Cloud);
        assert_eq!(first, second);
    }

    #[test]
    fn no_cues_is_other() {
        assert_eq!(categorize(Platform::Other, "hello"), Category::Other);
    }
}
