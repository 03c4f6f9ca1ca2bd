use std::sync::LazyLock;

use regex::Regex;

use crate::model::Platform;

/// Keyword list for the generic element scan. List order is match order: for
/// each element the first keyword its text contains wins.
pub const DETECTOR_KEYWORDS: &[&str] = &[
    "subscribe", "membership", "pricing", "plan", "billing",
    "free trial", "subscription", "payment", "sign up", "join now",
    "monthly", "yearly", "annual",
];

pub const SUBSCRIPTION_TERMS: &[&str] = &[
    "subscription", "subscribe", "membership", "plan", "pricing", "billing",
    "renewal", "upgrade", "join now", "sign up", "get started",
];

pub const PAYMENT_TERMS: &[&str] = &[
    "payment plan", "auto-renew", "recurring payment", "monthly charge",
    "annual fee", "per month", "per year", "charge", "invoice",
];

pub const TRIAL_TERMS: &[&str] = &[
    "free trial", "trial period", "first month free", "cancel anytime",
    "introductory offer", "discount", "promo", "limited offer",
];

pub const CANCELLATION_TERMS: &[&str] = &[
    "cancel subscription", "end membership", "unsubscribe", "deactivate",
    "pause subscription", "opt out",
];

/// Price patterns in priority order. Specific forms (cycle suffix, currency
/// code, discount phrasing) come before the bare dollar amount so the most
/// informative substring is the one that matches.
pub static PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // $9.99/month, $9.99 per mo, $120/year
        r"(?i)\$\d+(\.\d{2})?\s*/?\s*(?:per\s*)?(?:month|mo|year|yr|week|wk)\b",
        r"(?i)\$\d+(\.\d{2})?\s*(?:monthly|yearly|annually|weekly)\b",
        // International symbols, optional cycle suffix
        r"(?i)(?:€|£|¥|₹)\s*\d+(\.\d{2})?(?:\s*/\s*(?:month|mo|year|yr|week|wk))?",
        r"(?i)\d+(\.\d{2})?\s*(?:€|£|¥|₹)(?:\s*/\s*(?:month|mo|year|yr|week|wk))?",
        // Currency codes
        r"(?i)(?:USD|EUR|GBP|JPY|INR)\s*\d+(\.\d{2})?",
        // Discounted pricing
        r"(?i)was\s+(?:\$|€|£|¥|₹)\d+(\.\d{2})?\s+now\s+(?:\$|€|£|¥|₹)\d+(\.\d{2})?",
        r"(?i)save\s+\d+%",
        r"(?i)\d+%\s+off",
        // Bare dollar amount, last so the forms above win
        r"\$\d+(\.\d{2})?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Per-platform detection bundle. Selector order is significant: earlier
/// selectors are higher confidence and are tried first.
pub struct PlatformRules {
    pub platform: Platform,
    pub domains: &'static [&'static str],
    pub selectors: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub tiers: &'static [&'static str],
}

pub static PATREON: PlatformRules = PlatformRules {
    platform: Platform::Patreon,
    domains: &["patreon.com"],
    selectors: &[
        r#"[data-tag="pledge-card"]"#,
        ".pledge-card",
        ".tier-card",
        r#"[data-test-tag="patron-button"]"#,
    ],
    keywords: &["tier", "reward", "pledge", "patron", "benefits", "perks"],
    tiers: &[],
};

pub static TEBEX: PlatformRules = PlatformRules {
    platform: Platform::Tebex,
    domains: &["tebex.io"],
    selectors: &[
        ".package-listing",
        ".package-price",
        ".subscription-package",
        r#"[data-package-type="subscription"]"#,
    ],
    keywords: &[
        "server subscription",
        "recurring package",
        "monthly rank",
        "subscription package",
    ],
    tiers: &[],
};

pub static SAAS: PlatformRules = PlatformRules {
    platform: Platform::Saas,
    domains: &[],
    selectors: &[
        ".pricing-table",
        ".pricing-plan",
        ".pricing-tier",
        "[data-plan-type]",
    ],
    keywords: &[],
    tiers: &["basic", "pro", "enterprise", "starter", "business", "premium"],
};

pub static STREAMING: PlatformRules = PlatformRules {
    platform: Platform::Streaming,
    domains: &[
        "netflix.com",
        "disneyplus.com",
        "hulu.com",
        "amazon.com/prime",
        "youtube.com/premium",
    ],
    selectors: &[
        ".account-section",
        ".profile-hub",
        ".membership-section",
        r#"[data-uia*="plan"]"#,
        r#"[data-uia*="subscription"]"#,
    ],
    keywords: &["stream", "watch", "video", "movies", "shows", "live"],
    tiers: &["basic", "standard", "premium", "family plan", "student plan"],
};

pub fn rules_for(platform: Platform) -> Option<&'static PlatformRules> {
    match platform {
        Platform::Patreon => Some(&PATREON),
        Platform::Tebex => Some(&TEBEX),
        Platform::Saas => Some(&SAAS),
        Platform::Streaming => Some(&STREAMING),
        Platform::Other => None,
    }
}

// ── Tests ──
