//! Safety score to cadence tier mapping.

use wayguard_tracking_models::CadenceTier;

/// Scores below this sample at [`CadenceTier::HighAlert`].
pub const HIGH_ALERT_BELOW: i32 = 40;

/// Scores at or above this sample at [`CadenceTier::LowPower`].
pub const LOW_POWER_FROM: i32 = 70;

/// Maps a safety score to its cadence tier.
///
/// `score < 40` is `HIGH_ALERT`, `40 <= score < 70` is `CAUTION`, and
/// `score >= 70` is `LOW_POWER`.
#[must_use]
pub const fn tier_for(score: i32) -> CadenceTier {
    if score < HIGH_ALERT_BELOW {
        CadenceTier::HighAlert
    } else if score < LOW_POWER_FROM {
        CadenceTier::Caution
    } else {
        CadenceTier::LowPower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(tier_for(39), CadenceTier::HighAlert);
        assert_eq!(tier_for(40), CadenceTier::Caution);
        assert_eq!(tier_for(69), CadenceTier::Caution);
        assert_eq!(tier_for(70), CadenceTier::LowPower);
    }

    #[test]
    fn neutral_score_is_caution() {
        assert_eq!(
            tier_for(wayguard_zone_models::NEUTRAL_SCORE),
            CadenceTier::Caution
        );
    }

    #[test]
    fn full_range_is_monotonic() {
        for score in -10..=110 {
            let expected = if score < 40 {
                CadenceTier::HighAlert
            } else if score < 70 {
                CadenceTier::Caution
            } else {
                CadenceTier::LowPower
            };
            assert_eq!(tier_for(score), expected, "score {score}");
        }
    }
}
