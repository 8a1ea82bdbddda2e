//! Pari-mutuel payout and fee arithmetic.
//!
//! Winners split the entire pool proportionally to their stake on the
//! winning side, minus a protocol fee taken in basis points of the gross
//! payout. When a referrer is attached to the wager, a referral share is
//! carved out of the fee; the remainder goes to the treasury.

use serde::{Deserialize, Serialize};

/// Basis-point denominator for fee and referral rates (10_000 = 100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Breakdown of a single winning claim.
///
/// Invariant: `gross == net + admin_fee + referral_fee` exactly. The gross
/// amount is the participant's proportional share of the full pool,
/// including the return of their own stake.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutSplit {
    /// Proportional share of the pool before fees
    pub gross: u64,
    /// Amount paid to the participant
    pub net: u64,
    /// Fee share routed to the treasury
    pub admin_fee: u64,
    /// Fee share routed to the participant's referrer
    pub referral_fee: u64,
}

/// Compute the payout split for a winning stake.
///
/// # Arguments
/// * `stake` - The participant's stake on the winning side
/// * `total_pool` - Total value staked on both sides
/// * `winning_pool` - Total value staked on the winning side (must be > 0)
/// * `fee_bps` - Protocol fee in basis points of the gross payout
/// * `referral_bps` - Referral carve-out in basis points of the gross payout
/// * `has_referrer` - Whether a referrer is attached to the wager
///
/// The fee only applies when a losing side existed (`total_pool >
/// winning_pool`); a market where everyone staked the same way pays out
/// stakes in full. All division truncates, so rounding dust stays in the
/// pool rather than being distributed.
///
/// Callers must guarantee `winning_pool > 0`; a market whose winning side
/// is empty is settled by routing the pool to the treasury and never
/// reaches this function. Callers must also guarantee `referral_bps <=
/// fee_bps`, enforced at engine configuration time.
pub fn compute_payout(
    stake: u64,
    total_pool: u64,
    winning_pool: u64,
    fee_bps: u16,
    referral_bps: u16,
    has_referrer: bool,
) -> PayoutSplit {
    debug_assert!(winning_pool > 0, "winning pool must be non-empty");
    debug_assert!(u64::from(referral_bps) <= u64::from(fee_bps));

    // Intermediate products can exceed u64 at realistic pool sizes.
    let gross = (u128::from(stake) * u128::from(total_pool) / u128::from(winning_pool)) as u64;

    if total_pool == winning_pool {
        // No losing side: stakes come back in full, fee-free.
        return PayoutSplit {
            gross,
            net: gross,
            admin_fee: 0,
            referral_fee: 0,
        };
    }

    let total_fee = (u128::from(gross) * u128::from(fee_bps) / u128::from(BPS_DENOMINATOR)) as u64;
    let referral_fee = if has_referrer {
        (u128::from(gross) * u128::from(referral_bps) / u128::from(BPS_DENOMINATOR)) as u64
    } else {
        0
    };

    PayoutSplit {
        gross,
        net: gross - total_fee,
        admin_fee: total_fee - referral_fee,
        referral_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_payout_with_fee() {
        // A staked 100 on the winning side, pool is 400, fee 5%.
        let split = compute_payout(100, 400, 100, 500, 0, false);
        assert_eq!(split.gross, 400, "gross is stake scaled by pool over winning pool");
        assert_eq!(split.admin_fee, 20);
        assert_eq!(split.referral_fee, 0);
        assert_eq!(split.net, 380);
    }

    #[test]
    fn no_losing_side_means_no_fee() {
        let split = compute_payout(250, 1000, 1000, 500, 100, true);
        assert_eq!(split.gross, 250);
        assert_eq!(split.net, 250, "stake comes back in full");
        assert_eq!(split.admin_fee, 0);
        assert_eq!(split.referral_fee, 0);
    }

    #[test]
    fn referral_share_is_carved_out_of_fee() {
        // fee 5%, referral 1% of a 400 gross.
        let split = compute_payout(100, 400, 100, 500, 100, true);
        assert_eq!(split.net, 380);
        assert_eq!(split.referral_fee, 4);
        assert_eq!(split.admin_fee, 16);
        assert_eq!(split.gross, split.net + split.admin_fee + split.referral_fee);
    }

    #[test]
    fn no_referrer_routes_full_fee_to_treasury() {
        let split = compute_payout(100, 400, 100, 500, 100, false);
        assert_eq!(split.referral_fee, 0);
        assert_eq!(split.admin_fee, 20);
    }

    #[test]
    fn split_always_sums_to_gross() {
        for stake in [1u64, 7, 33, 100, 999] {
            for losing in [0u64, 1, 50, 12345] {
                let winning = 1000;
                let split = compute_payout(stake, winning + losing, winning, 500, 150, true);
                assert_eq!(
                    split.gross,
                    split.net + split.admin_fee + split.referral_fee,
                    "split must conserve the gross amount exactly"
                );
                assert!(split.net <= split.gross, "net never exceeds gross");
            }
        }
    }

    #[test]
    fn truncation_favors_the_pool() {
        // 3 winners of 1 each over a pool of 10: each gross is floor(10/3) = 3,
        // one unit of dust stays behind.
        let split = compute_payout(1, 10, 3, 0, 0, false);
        assert_eq!(split.gross, 3);
    }

    #[test]
    fn large_pools_do_not_overflow() {
        let stake = u64::MAX / 2;
        let split = compute_payout(stake, u64::MAX, stake, 500, 100, true);
        assert!(split.gross >= stake);
        assert_eq!(split.gross, split.net + split.admin_fee + split.referral_fee);
    }
}
