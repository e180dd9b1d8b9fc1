use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_TIERS: usize = 32;

/// Fee for registering a bracket of subjects, e.g. 6..=8 subjects costs `price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PricingTier {
    pub min_subjects: u32,
    pub max_subjects: u32,
    pub price: f64,
}

impl PricingTier {
    fn contains(&self, count: u32) -> bool {
        (self.min_subjects..=self.max_subjects).contains(&count)
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} subjects", self.min_subjects, self.max_subjects)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("at most 32 pricing tiers are allowed (got {0})")]
    TooManyTiers(usize),
    #[error("Invalid tier {0}: subject counts start at 1")]
    ZeroMinimum(PricingTier),
    #[error("Invalid tier {0}: min cannot be greater than max")]
    MinAboveMax(PricingTier),
    #[error("Invalid tier {0}: price must be a non-negative number")]
    InvalidPrice(PricingTier),
    #[error("Pricing tiers overlap: {0} and {1}")]
    Overlap(PricingTier, PricingTier),
}

impl PricingError {
    pub fn rule(&self) -> &'static str {
        match self {
            Self::TooManyTiers(_) => "too_many_tiers",
            Self::ZeroMinimum(_) => "zero_minimum",
            Self::MinAboveMax(_) => "min_above_max",
            Self::InvalidPrice(_) => "invalid_price",
            Self::Overlap(..) => "overlap",
        }
    }
}

/// Tiers ordered by their lower subject count.
pub fn sorted(tiers: &[PricingTier]) -> Vec<PricingTier> {
    let mut out = tiers.to_vec();
    out.sort_by_key(|t| (t.min_subjects, t.max_subjects));
    out
}

/// Same first-violation-wins shape as grade ranges. Gaps between tiers are allowed;
/// a count that falls in a gap simply has no price.
pub fn validate_tiers(tiers: &[PricingTier]) -> Result<(), PricingError> {
    if tiers.len() > MAX_TIERS {
        return Err(PricingError::TooManyTiers(tiers.len()));
    }
    for t in tiers {
        if t.min_subjects == 0 {
            return Err(PricingError::ZeroMinimum(*t));
        }
        if t.min_subjects > t.max_subjects {
            return Err(PricingError::MinAboveMax(*t));
        }
        if !t.price.is_finite() || t.price < 0.0 {
            return Err(PricingError::InvalidPrice(*t));
        }
    }
    let ordered = sorted(tiers);
    for pair in ordered.windows(2) {
        if pair[0].max_subjects >= pair[1].min_subjects {
            return Err(PricingError::Overlap(pair[0], pair[1]));
        }
    }
    Ok(())
}

pub fn price_for(tiers: &[PricingTier], subject_count: u32) -> Option<f64> {
    tiers
        .iter()
        .find(|t| t.contains(subject_count))
        .map(|t| t.price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: u32, max: u32, price: f64) -> PricingTier {
        PricingTier {
            min_subjects: min,
            max_subjects: max,
            price,
        }
    }

    #[test]
    fn disjoint_tiers_validate_and_quote() {
        let tiers = vec![tier(6, 8, 150.0), tier(1, 5, 100.0), tier(9, 12, 180.0)];
        assert_eq!(validate_tiers(&tiers), Ok(()));
        assert_eq!(price_for(&tiers, 1), Some(100.0));
        assert_eq!(price_for(&tiers, 8), Some(150.0));
        assert_eq!(price_for(&tiers, 12), Some(180.0));
        assert_eq!(price_for(&tiers, 13), None);
        assert_eq!(price_for(&tiers, 0), None);
    }

    #[test]
    fn overlapping_brackets_fail() {
        let tiers = vec![tier(1, 5, 100.0), tier(5, 8, 150.0)];
        let e = validate_tiers(&tiers).expect_err("overlap");
        assert_eq!(e.rule(), "overlap");
        assert_eq!(
            e.to_string(),
            "Pricing tiers overlap: 1-5 subjects and 5-8 subjects"
        );
    }

    #[test]
    fn malformed_tiers_fail() {
        assert_eq!(
            validate_tiers(&[tier(0, 3, 10.0)]).map_err(|e| e.rule()),
            Err("zero_minimum")
        );
        assert_eq!(
            validate_tiers(&[tier(4, 3, 10.0)]).map_err(|e| e.rule()),
            Err("min_above_max")
        );
        assert_eq!(
            validate_tiers(&[tier(1, 3, -0.5)]).map_err(|e| e.rule()),
            Err("invalid_price")
        );
        let many: Vec<_> = (1..=33).map(|i| tier(i, i, 1.0)).collect();
        assert_eq!(
            validate_tiers(&many).map_err(|e| e.rule()),
            Err("too_many_tiers")
        );
    }

    #[test]
    fn unknown_tier_keys_are_rejected() {
        let raw = serde_json::json!([{ "minSubjects": 1, "maxSubject": 5, "price": 100.0 }]);
        assert!(serde_json::from_value::<Vec<PricingTier>>(raw).is_err());
        let raw = serde_json::json!([
            { "minSubjects": 1, "maxSubjects": 5, "price": 100.0, "currency": "AUD" }
        ]);
        assert!(serde_json::from_value::<Vec<PricingTier>>(raw).is_err());
    }

    #[test]
    fn gaps_between_tiers_are_allowed() {
        let tiers = vec![tier(1, 3, 50.0), tier(6, 8, 90.0)];
        assert_eq!(validate_tiers(&tiers), Ok(()));
        assert_eq!(price_for(&tiers, 4), None);
        assert!(validate_tiers(&[]).is_ok());
    }
}
