use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::patterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    Quarterly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
            BillingCycle::Quarterly => "quarterly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Streaming,
    Music,
    Productivity,
    Gaming,
    Cloud,
    Software,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Streaming => "streaming",
            Category::Music => "music",
            Category::Productivity => "productivity",
            Category::Gaming => "gaming",
            Category::Cloud => "cloud",
            Category::Software => "software",
            Category::Other => "other",
        }
    }
}

/// Platform tag: selects the extraction strategy, never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Patreon,
    Tebex,
    Saas,
    Streaming,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Patreon => "patreon",
            Platform::Tebex => "tebex",
            Platform::Saas => "saas",
            Platform::Streaming => "streaming",
            Platform::Other => "other",
        }
    }

    pub fn rules(&self) -> Option<&'static patterns::PlatformRules> {
        patterns::rules_for(*self)
    }
}

/// Trial evidence found in page or document text. Duration-based evidence is
/// the most reliable, a literal end date next, a bare keyword hit last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrialInfo {
    pub is_trial: bool,
    pub duration_days: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Raw hit from the lightweight page scan: which phase fired and on what.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub content: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum SignalKind {
    Platform { platform: Platform },
    Keyword { keyword: &'static str },
    Price,
}

/// Full page-detection record. Only constructed once price extraction has
/// succeeded; an un-priced record is not actionable and is never emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedSubscription {
    pub service_name: String,
    pub price: f64,
    pub billing_cycle: BillingCycle,
    pub category: Category,
    pub url: String,
    pub is_trial: bool,
    pub trial_duration: Option<i64>,
    pub trial_start_date: Option<DateTime<Utc>>,
    pub trial_end_date: Option<DateTime<Utc>>,
}

/// Record produced per scanned email message or uploaded document. Built
/// independently of page records and never merged with them here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailSubscription {
    pub service_name: String,
    pub price: Option<f64>,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<NaiveDate>,
    pub category: Category,
}
