use crate::model::BillingCycle;

const YEARLY_CUES: &[&str] = &["per year", "/year", "annually", "yearly", "annual"];
const QUARTERLY_CUES: &[&str] = &["quarterly", "every 3 months", "/quarter"];

/// Total over all input: yearly cues first, then quarterly, defaulting to
/// monthly. Case-insensitive substring search.
pub fn billing_cycle(text: &str) -> BillingCycle {
    let lower = text.to_lowercase();
    if YEARLY_CUES.iter().any(|c| lower.contains(c)) {
        return BillingCycle::Yearly;
    }
    if QUARTERLY_CUES.iter().any(|c| lower.contains(c)) {
        return BillingCycle::Quarterly;
    }
    BillingCycle::Monthly
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yearly_cues() {
        assert_eq!(billing_cycle("$99 per year"), BillingCycle::Yearly);
        assert_eq!(billing_cycle("Billed ANNUALLY"), BillingCycle::Yearly);
        assert_eq!(billing_cycle("$120/year"), BillingCycle::Yearly);
    }

    #[test]
    fn quarterly_cues() {
        assert_eq!(billing_cycle("charged every 3 months"), BillingCycle::Quarterly);
        assert_eq!(billing_cycle("$30/quarter"), BillingCycle::Quarterly);
    }

    #[test]
    fn yearly_checked_before_quarterly() {
        let both = "switch from quarterly to yearly billing";
        assert_eq!(billing_cycle(both), BillingCycle::Yearly);
    }

    #[test]
    fn defaults_to_monthly() {
        assert_eq!(billing_cycle(""), BillingCycle::Monthly);
        assert_eq!(billing_cycle("$15.49/month"), BillingCycle::Monthly);
        assert_eq!(billing_cycle("no cues whatsoever"), BillingCycle::Monthly);
    }
}
