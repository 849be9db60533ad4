//! Deterministic risk scoring.
//!
//! Pure function over a report's status and verification fields; the store
//! re-runs it on every verification write and persists the result. Nothing
//! else may set `risk_score`.

use crate::types::{PatternTag, ReportStatus, Verification};

pub const MAX_RISK_SCORE: u8 = 100;

/// Verified reports at or above this score count as "high risk" in the
/// summary stats.
pub const HIGH_RISK_THRESHOLD: u8 = 70;

/// Additive point accumulation, clamped to [`MAX_RISK_SCORE`].
///
/// Unlocked liquidity (`liquidity_locked == Some(false)`) is the single
/// strongest signal; an unassessed flag (`None`) contributes nothing.
pub fn risk_score(status: ReportStatus, verification: &Verification) -> u8 {
    let mut score: u32 = 0;

    if status == ReportStatus::Verified {
        score += 30;
    }

    if verification.liquidity_locked == Some(false) {
        score += 40;
    }

    score += victims_loss_points(verification.victims_loss);

    if verification.pattern_found.contains(&PatternTag::LiquidityRemoval) {
        score += 10;
    }
    if verification.pattern_found.contains(&PatternTag::TeamDump) {
        score += 10;
    }

    score.min(u32::from(MAX_RISK_SCORE)) as u8
}

/// Single highest matching tier, not cumulative.
fn victims_loss_points(victims_loss: Option<f64>) -> u32 {
    match victims_loss {
        Some(loss) if loss > 100_000.0 => 20,
        Some(loss) if loss > 50_000.0 => 15,
        Some(loss) if loss > 10_000.0 => 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification(
        liquidity_locked: Option<bool>,
        victims_loss: Option<f64>,
        tags: &[&str],
    ) -> Verification {
        Verification {
            liquidity_locked,
            victims_loss,
            pattern_found: tags
                .iter()
                .map(|t| PatternTag::from((*t).to_string()))
                .collect(),
            ..Verification::default()
        }
    }

    #[test]
    fn test_everything_firing_clamps_to_100() {
        // 30 + 40 + 20 + 10 + 10 = 110, clamped
        let v = verification(
            Some(false),
            Some(150_000.0),
            &["liquidity_removal", "team_dump"],
        );
        assert_eq!(risk_score(ReportStatus::Verified, &v), 100);
    }

    #[test]
    fn test_benign_report_scores_zero() {
        let v = verification(Some(true), Some(5_000.0), &[]);
        assert_eq!(risk_score(ReportStatus::Pending, &v), 0);
    }

    #[test]
    fn test_mid_tier_combination() {
        // 30 (verified) + 0 (flag unset) + 15 (60k tier) + 10 (team_dump)
        let v = verification(None, Some(60_000.0), &["team_dump"]);
        assert_eq!(risk_score(ReportStatus::Verified, &v), 55);
    }

    #[test]
    fn test_unlocked_liquidity_vs_unset() {
        let unlocked = verification(Some(false), None, &[]);
        assert_eq!(risk_score(ReportStatus::Pending, &unlocked), 40);

        let unset = verification(None, None, &[]);
        assert_eq!(risk_score(ReportStatus::Pending, &unset), 0);

        let locked = verification(Some(true), None, &[]);
        assert_eq!(risk_score(ReportStatus::Pending, &locked), 0);
    }

    #[test]
    fn test_victims_loss_tiers_pick_highest_only() {
        assert_eq!(victims_loss_points(Some(10_000.0)), 0); // boundary: not strictly greater
        assert_eq!(victims_loss_points(Some(10_000.01)), 10);
        assert_eq!(victims_loss_points(Some(50_000.0)), 10);
        assert_eq!(victims_loss_points(Some(50_000.01)), 15);
        assert_eq!(victims_loss_points(Some(100_000.0)), 15);
        assert_eq!(victims_loss_points(Some(100_000.01)), 20);
        assert_eq!(victims_loss_points(Some(1e12)), 20);
    }

    #[test]
    fn test_negative_and_absent_loss_score_nothing() {
        assert_eq!(victims_loss_points(Some(-50_000.0)), 0);
        assert_eq!(victims_loss_points(None), 0);
    }

    #[test]
    fn test_unknown_tags_are_ignored() {
        let v = verification(None, None, &["honeypot", "wash_trading"]);
        assert_eq!(risk_score(ReportStatus::Pending, &v), 0);
    }

    #[test]
    fn test_score_always_bounded() {
        // Absurd inputs still land in [0, 100]
        let v = verification(
            Some(false),
            Some(f64::MAX),
            &["liquidity_removal", "team_dump", "honeypot"],
        );
        for status in [
            ReportStatus::Pending,
            ReportStatus::Investigating,
            ReportStatus::Verified,
            ReportStatus::Rejected,
            ReportStatus::Disputed,
        ] {
            let score = risk_score(status, &v);
            assert!(score <= MAX_RISK_SCORE);
        }
    }
}
