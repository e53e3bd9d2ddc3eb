use vigil_core::Freshness;

pub const DAY_SECS: i64 = 86_400;
pub const FRESH_MAX_DAYS: i64 = 30;
pub const AGING_MAX_DAYS: i64 = 90;
pub const SETTLED_MAX_DAYS: i64 = 180;

/// Freshness is a pure function of age. `Bedrock` is never produced here;
/// entries only reach it through an archive promotion.
pub fn classify(age_secs: i64) -> Freshness {
    let days = age_secs / DAY_SECS;
    if days < FRESH_MAX_DAYS {
        Freshness::Fresh
    } else if days < AGING_MAX_DAYS {
        Freshness::Aging
    } else if days < SETTLED_MAX_DAYS {
        Freshness::Settled
    } else {
        Freshness::BedrockEligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: i64) -> i64 {
        n * DAY_SECS
    }

    #[test]
    fn classification_at_representative_ages() {
        assert_eq!(classify(days(29)), Freshness::Fresh);
        assert_eq!(classify(days(31)), Freshness::Aging);
        assert_eq!(classify(days(89)), Freshness::Aging);
        assert_eq!(classify(days(91)), Freshness::Settled);
        assert_eq!(classify(days(179)), Freshness::Settled);
        assert_eq!(classify(days(181)), Freshness::BedrockEligible);
    }

    #[test]
    fn classification_at_exact_boundaries() {
        assert_eq!(classify(days(30)), Freshness::Aging);
        assert_eq!(classify(days(90)), Freshness::Settled);
        assert_eq!(classify(days(180)), Freshness::BedrockEligible);
        assert_eq!(classify(0), Freshness::Fresh);
    }
}
