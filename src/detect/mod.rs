use tracing::debug;

use crate::extract::{self, platform};
use crate::model::{DetectedSubscription, Platform, Signal, SignalKind};
use crate::page::PageSnapshot;
use crate::patterns::{
    CANCELLATION_TERMS, DETECTOR_KEYWORDS, PAYMENT_TERMS, PRICE_PATTERNS, SUBSCRIPTION_TERMS,
};

/// Multi-strategy page detector. Three ordered phases, first hit wins:
/// platform-specific selectors, generic element/keyword scan, price patterns
/// over the page text. Platform markup is stable and high precision, so it
/// always beats a free-text price hit.
///
/// After the first completed scan the outcome is cached; repeat calls return
/// the cached value without touching the DOM again, so mutation-triggered
/// re-invocations cannot flicker or duplicate side effects.
pub struct PageDetector<'a> {
    page: &'a PageSnapshot,
    scanned: bool,
    last_signal: Option<Signal>,
    full: Option<Option<DetectedSubscription>>,
}

impl<'a> PageDetector<'a> {
    pub fn new(page: &'a PageSnapshot) -> Self {
        Self {
            page,
            scanned: false,
            last_signal: None,
            full: None,
        }
    }

    /// Lightweight scan: reports the first subscription signal on the page,
    /// or `None` — the expected outcome on most pages, not an error.
    pub fn detect(&mut self) -> Option<Signal> {
        if self.scanned {
            return self.last_signal.clone();
        }
        let result = self.scan();
        self.scanned = true;
        self.last_signal = result.clone();
        result
    }

    fn scan(&self) -> Option<Signal> {
        let url = self.page.url();

        // Phase 1: platform-specific selectors for URL-identified platforms.
        if let Some(platform) = platform::from_url(url) {
            if let Some(rules) = platform.rules() {
                if let Some(content) = self.page.select_first_text(rules.selectors) {
                    debug!(platform = platform.as_str(), "platform selector hit");
                    return Some(Signal {
                        kind: SignalKind::Platform { platform },
                        content,
                        url: url.to_string(),
                    });
                }
            }
        }

        // Phase 2: generic element scan. Document order outside, keyword list
        // order inside; stop at the first hit — this is a detector, not an
        // aggregator.
        for text in self.page.text_elements() {
            if text.is_empty() {
                continue;
            }
            let lower = text.to_lowercase();
            if let Some(keyword) = DETECTOR_KEYWORDS.iter().find(|k| lower.contains(*k)) {
                debug!(keyword, "keyword hit");
                return Some(Signal {
                    kind: SignalKind::Keyword { keyword },
                    content: text,
                    url: url.to_string(),
                });
            }
        }

        // Phase 3: price patterns over the whole page text, library order.
        let body = self.page.body_text();
        for pattern in PRICE_PATTERNS.iter() {
            if let Some(m) = pattern.find(&body) {
                debug!(matched = m.as_str(), "price pattern hit");
                return Some(Signal {
                    kind: SignalKind::Price,
                    content: m.as_str().to_string(),
                    url: url.to_string(),
                });
            }
        }

        None
    }

    /// High-fidelity variant: build a full record. A bare price-pattern hit
    /// is not enough — corroborating subscription/payment/cancellation
    /// evidence is required — and no record is emitted unless price
    /// extraction succeeds.
    pub fn detect_subscription(&mut self) -> Option<DetectedSubscription> {
        if let Some(cached) = &self.full {
            return cached.clone();
        }
        let result = self.build_record();
        self.full = Some(result.clone());
        result
    }

    fn build_record(&mut self) -> Option<DetectedSubscription> {
        let signal = self.detect()?;
        let url = self.page.url().to_string();
        let body = self.page.body_text();

        if matches!(signal.kind, SignalKind::Price) && !has_corroboration(&body) {
            debug!("price hit without corroborating terms, dropping");
            return None;
        }

        let price = extract::extract_price(&body)?;
        let platform = extract::detect_platform(&url, &body);
        let trial = extract::trial_info(&body);

        Some(DetectedSubscription {
            service_name: extract::service::from_page(self.page),
            price,
            billing_cycle: extract::billing_cycle(&body),
            category: extract::categorize(platform, &body),
            url,
            is_trial: trial.is_trial,
            trial_duration: trial.duration_days,
            trial_start_date: trial.start_date,
            trial_end_date: trial.end_date,
        })
    }
}

fn has_corroboration(text: &str) -> bool {
    let lower = text.to_lowercase();
    SUBSCRIPTION_TERMS.iter().any(|t| lower.contains(t))
        || PAYMENT_TERMS.iter().any(|t| lower.contains(t))
        || CANCELLATION_TERMS.iter().any(|t| lower.contains(t))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingCycle, Category};

    fn snapshot(fixture: &str, url: &str) -> PageSnapshot {
        let html =
            std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        PageSnapshot::parse(&html, url)
    }

    #[test]
    fn keyword_phase_reports_first_matching_keyword() {
        let page = snapshot("keyword", "https://example.com/premium");
        let mut detector = PageDetector::new(&page);
        let signal = detector.detect().unwrap();
        assert_eq!(signal.content, "Subscribe now for premium access");
        assert_eq!(
            signal.kind,
            SignalKind::Keyword { keyword: "subscribe" }
        );
    }

    #[test]
    fn price_phase_reports_discount_substring() {
        let page = snapshot("discount", "https://example.com/sale");
        let mut detector = PageDetector::new(&page);
        let signal = detector.detect().unwrap();
        assert_eq!(signal.kind, SignalKind::Price);
        assert_eq!(signal.content, "was $19.99 now $14.99");
    }

    #[test]
    fn quiet_page_yields_nothing() {
        let page = snapshot("blog", "https://example.com/posts/42");
        let mut detector = PageDetector::new(&page);
        assert_eq!(detector.detect(), None);
        assert_eq!(detector.detect_subscription(), None);
    }

    #[test]
    fn detect_is_idempotent_after_first_result() {
        let page = snapshot("keyword", "https://example.com/premium");
        let mut detector = PageDetector::new(&page);
        let first = detector.detect();
        let second = detector.detect();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn negative_outcome_is_cached_too() {
        let page = snapshot("blog", "https://example.com/posts/42");
        let mut detector = PageDetector::new(&page);
        assert_eq!(detector.detect(), None);
        assert_eq!(detector.detect(), None);
    }

    #[test]
    fn platform_phase_beats_keywords_and_prices() {
        let page = snapshot("netflix", "https://www.netflix.com/account");
        let mut detector = PageDetector::new(&page);
        let signal = detector.detect().unwrap();
        assert_eq!(
            signal.kind,
            SignalKind::Platform { platform: Platform::Streaming }
        );
    }

    #[test]
    fn netflix_full_record() {
        let page = snapshot("netflix", "https://www.netflix.com/account");
        let mut detector = PageDetector::new(&page);
        let sub = detector.detect_subscription().unwrap();
        assert_eq!(sub.service_name, "Netflix");
        assert_eq!(sub.price, 15.49);
        assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
        assert_eq!(sub.category, Category::Streaming);
        assert!(!sub.is_trial);
    }

    #[test]
    fn saas_pricing_full_record_with_trial() {
        let page = snapshot("pricing", "https://acme.example/pricing");
        let mut detector = PageDetector::new(&page);
        let sub = detector.detect_subscription().unwrap();
        assert_eq!(sub.service_name, "Acme Cloud");
        assert_eq!(sub.price, 12.0);
        assert_eq!(sub.category, Category::Cloud);
        assert!(sub.is_trial);
        assert_eq!(sub.trial_duration, Some(14));
    }

    #[test]
    fn full_record_is_cached() {
        // Trial start/end derive from "now"; the cache guarantees repeat
        // calls return the identical record.
        let page = snapshot("pricing", "https://acme.example/pricing");
        let mut detector = PageDetector::new(&page);
        let first = detector.detect_subscription();
        let second = detector.detect_subscription();
        assert_eq!(first, second);
    }

    #[test]
    fn bare_price_without_corroboration_gives_no_record() {
        let page = snapshot("discount", "https://example.com/sale");
        let mut detector = PageDetector::new(&page);
        assert!(detector.detect().is_some());
        assert_eq!(detector.detect_subscription(), None);
    }
}
