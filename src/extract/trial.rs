use std::sync::LazyLock;

use chrono::{Duration, Utc};
use regex::Regex;

use crate::extract::dates;
use crate::model::TrialInfo;
use crate::patterns::TRIAL_TERMS;

static DAY_TRIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{1,3})[-\s]day(?:s)?\s+(?:free\s+)?trial").unwrap());

static TRIAL_ENDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)trial\s+ends?\s+on\s+([A-Za-z]+\s+\d{1,2},?\s+\d{4})").unwrap()
});

/// Trial detection with a precision preference: a parseable duration beats a
/// parsed end-date phrase, which beats a bare keyword hit.
pub fn trial_info(text: &str) -> TrialInfo {
    let lower = text.to_lowercase();
    let has_cue =
        lower.contains("trial") || TRIAL_TERMS.iter().any(|t| lower.contains(t));
    if !has_cue {
        return TrialInfo::default();
    }

    // "30-day free trial": duration known, start = now, end = now + duration.
    if let Some(caps) = DAY_TRIAL_RE.captures(text) {
        if let Ok(days) = caps[1].parse::<i64>() {
            let start = Utc::now();
            return TrialInfo {
                is_trial: true,
                duration_days: Some(days),
                start_date: Some(start),
                end_date: Some(start + Duration::days(days)),
            };
        }
    }

    // "trial ends on March 5, 2025": end date literal, duration unknown.
    if let Some(caps) = TRIAL_ENDS_RE.captures(text) {
        if let Some(date) = dates::parse_date(&caps[1]) {
            let end = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
            return TrialInfo {
                is_trial: true,
                duration_days: None,
                start_date: None,
                end_date: end,
            };
        }
    }

    // Keyword evidence only: trial, but nothing datable.
    TrialInfo {
        is_trial: true,
        ..TrialInfo::default()
    }
}

// ── Tests ──
