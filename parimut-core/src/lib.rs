//! # Parimut Core
//!
//! Core Rust library for a pari-mutuel settlement engine over binary
//! wagering markets.
//!
//! Participants stake value on the Yes or No side of a proposition. After
//! the market's end time the proposition is resolved against an external
//! price feed (or an administrative decision for manual markets), and
//! winners split the entire pool proportionally to their stake, minus a
//! protocol fee with an optional referral carve-out. Cancelled markets
//! refund every stake in full.
//!
//! ## Features
//!
//! - **Market lifecycle**: open, resolve (oracle-backed or manual), cancel,
//!   emergency refund, dormant-residue sweep
//! - **Pari-mutuel payouts**: exact fee/referral splits with truncating
//!   arithmetic that never over-pays the pool
//! - **Oracle validation**: price samples accepted only within a 24-hour
//!   window around the market end time
//! - **Reentrancy safety**: a single-flight guard around every external
//!   value transfer
//!
//! The substrate the engine runs on is injected: a [`Clock`], a value
//! [`Transfer`] capability, and a [`PriceFeed`]. Production wires in the
//! real primitives; tests wire in deterministic fakes.
//!
//! ## Examples
//!
//! ```rust
//! use parimut_core::{
//!     Direction, EngineConfig, Funding, MarketConfig, PriceFeed, PriceSample,
//!     SettlementEngine, Side, SystemClock, Transfer,
//! };
//!
//! // A manual market needs no feed; stub the capability out.
//! struct NoFeed;
//! impl PriceFeed for NoFeed {
//!     fn round(&self, feed: &str, round_id: u64) -> parimut_core::Result<PriceSample> {
//!         Err(parimut_core::EngineError::FeedUnavailable {
//!             feed: feed.to_string(),
//!             round_id,
//!         })
//!     }
//! }
//!
//! struct PrintingBank;
//! impl Transfer for PrintingBank {
//!     fn send(&mut self, recipient: &str, amount: u64) -> Result<(), String> {
//!         println!("send {amount} to {recipient}");
//!         Ok(())
//!     }
//! }
//!
//! let mut engine = SettlementEngine::new(
//!     EngineConfig {
//!         admin: "admin".to_string(),
//!         treasury: "treasury".to_string(),
//!         fee_bps: 500,
//!         referral_bps: 100,
//!         min_stake: 1,
//!     },
//!     Box::new(NoFeed),
//!     Box::new(PrintingBank),
//!     Box::new(SystemClock),
//! )?;
//!
//! let market = engine.create_market(
//!     "admin",
//!     MarketConfig {
//!         question: "Will it rain in Lisbon tomorrow?".to_string(),
//!         metadata: String::new(),
//!         end_time: 4_102_444_800, // far future
//!         target_price: 0,
//!         feed: None,
//!         settlement_asset: "usd-token".to_string(),
//!         direction: Direction::AtOrAbove,
//!     },
//! )?;
//!
//! engine.stake("alice", market, Side::Yes, Funding::Attached(100), None)?;
//! assert_eq!(engine.market_status(market)?.total_yes, 100);
//! Ok::<(), parimut_core::EngineError>(())
//! ```

pub mod engine;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod oracle;
pub mod payout;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use engine::{Clock, EngineConfig, Funding, SettlementEngine, SystemClock, Transfer};
pub use error::{EngineError, Result};
pub use guard::ReentrancyGuard;
pub use ledger::{WagerLedger, WagerRecord};
pub use oracle::{
    evaluate_sample, Direction, OracleVerdict, PriceFeed, PriceSample, ORACLE_WINDOW_SECS,
};
pub use payout::{compute_payout, PayoutSplit, BPS_DENOMINATOR};
pub use registry::{MarketConfig, MarketRegistry, MarketStatus, Outcome, Side};

/// Dense market identifier, assigned sequentially at creation.
pub type MarketId = u64;

/// Opaque account reference for participants, referrers, and the treasury.
pub type AccountId = String;

/// Grace period after a market's end time before anyone may trigger an
/// emergency refund (3 days).
pub const EMERGENCY_GRACE_SECS: u64 = 3 * 24 * 60 * 60;

/// Dormancy period after resolution before the administrator may sweep
/// unclaimed residue to the treasury (365 days).
pub const SWEEP_DORMANCY_SECS: u64 = 365 * 24 * 60 * 60;
