//! Error types for parimut-core

use crate::MarketId;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error types for market settlement operations.
///
/// Every variant carries the values a caller needs to decide whether the
/// failure is permanent for these arguments (wrong caller, wrong state) or
/// retryable (oracle sample outside the window, failed transfer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Caller is not allowed to perform an administrator-only action
    #[error("unauthorized: caller {caller} is not the administrator")]
    Unauthorized { caller: String },

    /// Unknown market identifier
    #[error("market {0} not found")]
    NotFound(MarketId),

    /// Market no longer accepts stakes
    #[error("market {id} is closed for staking (resolved: {resolved}, cancelled: {cancelled}, ended: {ended})")]
    MarketClosed {
        id: MarketId,
        resolved: bool,
        cancelled: bool,
        ended: bool,
    },

    /// Resolution or cancellation was attempted twice
    #[error("market {0} is already resolved or cancelled")]
    AlreadyResolved(MarketId),

    /// Resolution attempted before the market's end time
    #[error("market {id} has not ended yet (ends at {end_time}, now {now})")]
    MarketNotEnded {
        id: MarketId,
        end_time: u64,
        now: u64,
    },

    /// Claim attempted on a market that has no outcome yet
    #[error("market {0} is not resolved")]
    NotResolved(MarketId),

    /// Refund withdrawal attempted on a market that was not voided
    #[error("market {0} is not cancelled or void")]
    NotCancelled(MarketId),

    /// Claim attempted on a voided market (use the refund path instead)
    #[error("market {0} was voided; stakes are refunded, not redistributed")]
    MarketVoided(MarketId),

    /// The wager was already paid out
    #[error("wager on market {market} by {participant} is already claimed")]
    AlreadyClaimed {
        market: MarketId,
        participant: String,
    },

    /// The participant has nothing to collect on this market
    #[error("no claimable stake on market {market} for {participant}")]
    NoStake {
        market: MarketId,
        participant: String,
    },

    /// Stake below the configured minimum
    #[error("stake of {amount} is below the minimum of {minimum}")]
    StakeTooSmall { amount: u64, minimum: u64 },

    /// Zero-value operation rejected
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Market created with an end time that is not in the future
    #[error("end time {end_time} is not in the future (now {now})")]
    InvalidEndTime { end_time: u64, now: u64 },

    /// Engine configuration rejected at construction
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Oracle sample fell outside the acceptance window; retry with another round
    #[error("oracle round {round_id} is outside the acceptance window (sample at {sample_time}, market ends {end_time}, window is +/-{window}s)")]
    InvalidOracleRound {
        round_id: u64,
        sample_time: u64,
        end_time: u64,
        window: u64,
    },

    /// The price feed has no data for the requested round
    #[error("price feed {feed} has no sample for round {round_id}")]
    FeedUnavailable { feed: String, round_id: u64 },

    /// Oracle resolution attempted on a manually-resolved market
    #[error("market {0} is not oracle-backed")]
    NotOracleBacked(MarketId),

    /// Manual resolution attempted on an oracle-backed market
    #[error("market {0} requires oracle resolution")]
    OracleBacked(MarketId),

    /// Balance-funded stake or withdrawal exceeds the available balance
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u64, required: u64 },

    /// Staking is administratively paused
    #[error("staking is paused")]
    Paused,

    /// Emergency refund attempted before the grace period elapsed
    #[error("grace period for market {id} is active until {available_at} (now {now})")]
    GracePeriodActive {
        id: MarketId,
        available_at: u64,
        now: u64,
    },

    /// Sweep attempted before the dormancy period elapsed
    #[error("dormancy period for market {id} is active until {available_at} (now {now})")]
    DormancyActive {
        id: MarketId,
        available_at: u64,
        now: u64,
    },

    /// External value transfer did not succeed; state was restored, retry later
    #[error("transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        recipient: String,
        amount: u64,
        reason: String,
    },

    /// Reentrant call rejected by the single-flight guard
    #[error("reentrant call rejected")]
    Reentrant,
}
