use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// Next-billing phrase patterns in priority order; the first one whose date
/// token actually parses wins.
static NEXT_BILLING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)next\s+billing\s+date:?\s*([A-Za-z]+\s+\d{1,2},?\s+\d{4})",
        r"(?i)next\s+payment:?\s*([A-Za-z]+\s+\d{1,2},?\s+\d{4})",
        r"(?i)renews?\s+on\s+([A-Za-z]+\s+\d{1,2},?\s+\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%B %d %Y", "%b %d, %Y", "%b %d %Y"];

/// Parse a "March 5, 2025"-style calendar token. Unparseable input is `None`,
/// never an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(cleaned, f).ok())
}

pub fn next_billing_date(text: &str) -> Option<NaiveDate> {
    for re in NEXT_BILLING_RES.iter() {
        if let Some(caps) = re.captures(text) {
            if let Some(date) = parse_date(&caps[1]) {
                return Some(date);
            }
        }
    }
    None
}

// ── Tests ──
