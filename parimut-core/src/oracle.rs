//! Oracle sample validation and win-condition evaluation.
//!
//! The engine never runs oracle infrastructure of its own. Resolution takes
//! an externally supplied price sample, checks that its timestamp falls
//! inside the acceptance window around the market's end time, and evaluates
//! the market's win condition against the sampled price. Evaluation is pure
//! and idempotent; an out-of-window sample is a retryable condition, not a
//! market failure.

use crate::error::Result;
use crate::registry::Side;
use serde::{Deserialize, Serialize};

/// Acceptance window around the market end time for oracle samples (24h).
pub const ORACLE_WINDOW_SECS: u64 = 24 * 60 * 60;

/// A single timestamped price sample from an external feed round.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceSample {
    /// Sampled price, in the feed's own integer units
    pub price: u64,
    /// Unix timestamp of the sample
    pub timestamp: u64,
}

/// Comparison direction for the market's win condition.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Yes wins when the settled price is strictly below the target
    Below,
    /// Yes wins when the settled price is at or above the target
    AtOrAbove,
}

/// Result of evaluating an oracle sample against a market's terms.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleVerdict {
    /// Which side the sampled price favors
    pub winner: Side,
    /// The sampled price, echoed for audit logging
    pub price: u64,
    /// Whether the sample fell inside the acceptance window
    pub valid: bool,
}

/// External price feed, queried by round identifier.
///
/// Implementations are expected to serve immutable historical data: asking
/// for the same round twice must yield the same sample.
pub trait PriceFeed {
    /// Fetch the sample recorded for `round_id` on the given feed.
    fn round(&self, feed: &str, round_id: u64) -> Result<PriceSample>;
}

/// Evaluate an oracle sample against a market's target and direction.
///
/// The sample is valid when its timestamp is within
/// [`ORACLE_WINDOW_SECS`] of `end_time`, inclusive at both boundaries.
/// The verdict's winner is computed regardless of validity so callers can
/// log what an invalid round would have decided.
pub fn evaluate_sample(
    sample: &PriceSample,
    end_time: u64,
    target_price: u64,
    direction: Direction,
) -> OracleVerdict {
    let valid = sample.timestamp.abs_diff(end_time) <= ORACLE_WINDOW_SECS;

    let yes_wins = match direction {
        Direction::Below => sample.price < target_price,
        Direction::AtOrAbove => sample.price >= target_price,
    };

    OracleVerdict {
        winner: if yes_wins { Side::Yes } else { Side::No },
        price: sample.price,
        valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const END: u64 = 1_735_689_600;
    const TARGET: u64 = 50_000;

    fn sample(price: u64, timestamp: u64) -> PriceSample {
        PriceSample { price, timestamp }
    }

    #[test]
    fn below_direction_compares_strictly() {
        let verdict = evaluate_sample(&sample(49_999, END), END, TARGET, Direction::Below);
        assert_eq!(verdict.winner, Side::Yes);

        let verdict = evaluate_sample(&sample(50_000, END), END, TARGET, Direction::Below);
        assert_eq!(verdict.winner, Side::No, "price equal to target is not below it");
    }

    #[test]
    fn at_or_above_direction_includes_target() {
        let verdict = evaluate_sample(&sample(50_000, END), END, TARGET, Direction::AtOrAbove);
        assert_eq!(verdict.winner, Side::Yes);

        let verdict = evaluate_sample(&sample(49_999, END), END, TARGET, Direction::AtOrAbove);
        assert_eq!(verdict.winner, Side::No);
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let at_lower = evaluate_sample(
            &sample(1, END - ORACLE_WINDOW_SECS),
            END,
            TARGET,
            Direction::Below,
        );
        assert!(at_lower.valid, "sample exactly 24h before end is valid");

        let at_upper = evaluate_sample(
            &sample(1, END + ORACLE_WINDOW_SECS),
            END,
            TARGET,
            Direction::Below,
        );
        assert!(at_upper.valid, "sample exactly 24h after end is valid");

        let past_lower = evaluate_sample(
            &sample(1, END - ORACLE_WINDOW_SECS - 1),
            END,
            TARGET,
            Direction::Below,
        );
        assert!(!past_lower.valid, "one second outside the window is invalid");

        let past_upper = evaluate_sample(
            &sample(1, END + ORACLE_WINDOW_SECS + 1),
            END,
            TARGET,
            Direction::Below,
        );
        assert!(!past_upper.valid);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let s = sample(42_000, END + 100);
        let first = evaluate_sample(&s, END, TARGET, Direction::Below);
        let second = evaluate_sample(&s, END, TARGET, Direction::Below);
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_sample_still_reports_price() {
        let verdict = evaluate_sample(
            &sample(42_000, END + ORACLE_WINDOW_SECS + 3600),
            END,
            TARGET,
            Direction::Below,
        );
        assert!(!verdict.valid);
        assert_eq!(verdict.price, 42_000);
    }
}
