use std::sync::LazyLock;

use regex::Regex;

use crate::extract::platform;
use crate::page::PageSnapshot;

/// Subject phrase patterns in priority order.
static SUBJECT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)your\s+(.+?)\s+subscription",
        r"(?i)(.+?)\s+invoice",
        r"(?i)(.+?)\s+receipt",
        r"(?i)payment\s+confirmation\s+from\s+(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SENDER_DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9-]+)\.").unwrap());

/// Service name from an email: subject phrases first, sender domain label as
/// the fallback. `None` when neither yields anything usable; the caller drops
/// such messages silently.
pub fn from_subject(subject: &str, from: &str) -> Option<String> {
    for re in SUBJECT_RES.iter() {
        if let Some(caps) = re.captures(subject) {
            let name = clean_name(&caps[1]);
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    SENDER_DOMAIN_RE
        .captures(from)
        .map(|caps| clean_name(&caps[1]))
        .filter(|name| !name.is_empty())
}

/// Service name for a page record: og:title → document title → hostname
/// label, first non-empty source wins.
pub fn from_page(page: &PageSnapshot) -> String {
    if let Some(title) = page.og_title().filter(|t| !t.trim().is_empty()) {
        return title.trim().to_string();
    }
    if let Some(title) = page.title().filter(|t| !t.trim().is_empty()) {
        return title.trim().to_string();
    }
    domain_label(page.url()).unwrap_or_else(|| "Unknown".to_string())
}

fn domain_label(url: &str) -> Option<String> {
    let host = platform::hostname(url)?;
    let label = host.split('.').next()?;
    if label.is_empty() {
        return None;
    }
    Some(title_case(label))
}

/// Strip anything that is not alphanumeric, space, or hyphen; split on
/// whitespace and hyphens; title-case each token; rejoin with single spaces.
pub fn clean_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

// ── Tests ──
