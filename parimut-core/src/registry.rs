//! Market configuration and status bookkeeping.
//!
//! The registry owns the immutable terms of every market and its mutable
//! status (pool totals and resolution outcome), indexed by a dense `u64`
//! identifier. It is pure bookkeeping: authorization and clock checks live
//! in the settlement engine, which passes the current time in explicitly.

use crate::error::{EngineError, Result};
use crate::oracle::Direction;
use crate::MarketId;
use serde::{Deserialize, Serialize};

/// One side of a binary market.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Yes,
    No,
}

/// Terminal outcome of a market.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Not yet resolved
    #[default]
    Pending,
    /// The No side won
    No,
    /// The Yes side won
    Yes,
    /// Market cancelled; stakes are refunded
    Void,
}

impl From<Side> for Outcome {
    fn from(side: Side) -> Self {
        match side {
            Side::Yes => Outcome::Yes,
            Side::No => Outcome::No,
        }
    }
}

/// Immutable terms of a market, fixed at creation.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MarketConfig {
    /// The proposition being wagered on
    pub question: String,
    /// Opaque metadata reference (UI payload, external document id)
    pub metadata: String,
    /// Unix timestamp after which no stakes are accepted
    pub end_time: u64,
    /// Price the settled sample is compared against
    pub target_price: u64,
    /// Oracle feed reference; `None` marks a manually-resolved market
    pub feed: Option<String>,
    /// Reference to the asset stakes are denominated in
    pub settlement_asset: String,
    /// Which way the price comparison decides the Yes side
    pub direction: Direction,
}

/// Mutable status of a market: pool totals and resolution state.
///
/// Pool totals only ever grow while the market is open, and
/// `total_pool == total_yes + total_no` holds at every point before
/// resolution. After resolution the status is frozen.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MarketStatus {
    pub resolved: bool,
    pub cancelled: bool,
    pub outcome: Outcome,
    pub total_pool: u64,
    pub total_yes: u64,
    pub total_no: u64,
    /// Total staked on the winning side, cached at resolution
    pub winning_pool: u64,
    /// When the market was resolved or cancelled
    pub resolved_at: Option<u64>,
}

impl MarketStatus {
    /// Total staked on the given side.
    pub fn side_total(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.total_yes,
            Side::No => self.total_no,
        }
    }

    /// Whether the market still accepts stakes at `now`.
    pub fn is_open(&self, end_time: u64, now: u64) -> bool {
        !self.resolved && !self.cancelled && now < end_time
    }
}

/// Arena of market records indexed by a dense integer identifier.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MarketRegistry {
    configs: Vec<MarketConfig>,
    statuses: Vec<MarketStatus>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new market with zeroed totals; returns its identifier.
    pub fn create(&mut self, config: MarketConfig) -> MarketId {
        let id = self.configs.len() as MarketId;
        self.configs.push(config);
        self.statuses.push(MarketStatus::default());
        id
    }

    /// Number of markets ever created.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Look up a market's immutable terms.
    pub fn config(&self, id: MarketId) -> Result<&MarketConfig> {
        self.configs
            .get(id as usize)
            .ok_or(EngineError::NotFound(id))
    }

    /// Look up a market's current status.
    pub fn status(&self, id: MarketId) -> Result<&MarketStatus> {
        self.statuses
            .get(id as usize)
            .ok_or(EngineError::NotFound(id))
    }

    fn status_mut(&mut self, id: MarketId) -> Result<&mut MarketStatus> {
        self.statuses
            .get_mut(id as usize)
            .ok_or(EngineError::NotFound(id))
    }

    /// Add `amount` to one side of an open market's pool.
    ///
    /// Fails with `MarketClosed` once the market is resolved, cancelled, or
    /// past its end time.
    pub fn record_stake(&mut self, id: MarketId, side: Side, amount: u64, now: u64) -> Result<()> {
        let end_time = self.config(id)?.end_time;
        let status = self.status_mut(id)?;

        if !status.is_open(end_time, now) {
            return Err(EngineError::MarketClosed {
                id,
                resolved: status.resolved,
                cancelled: status.cancelled,
                ended: now >= end_time,
            });
        }

        match side {
            Side::Yes => status.total_yes += amount,
            Side::No => status.total_no += amount,
        }
        status.total_pool += amount;
        Ok(())
    }

    /// One-way transition from unresolved to resolved.
    pub fn resolve(
        &mut self,
        id: MarketId,
        outcome: Outcome,
        winning_pool: u64,
        now: u64,
    ) -> Result<()> {
        let status = self.status_mut(id)?;
        if status.resolved || status.cancelled {
            return Err(EngineError::AlreadyResolved(id));
        }
        status.resolved = true;
        status.outcome = outcome;
        status.winning_pool = winning_pool;
        status.resolved_at = Some(now);
        Ok(())
    }

    /// One-way transition to the cancelled (void) state.
    ///
    /// Fails with `AlreadyResolved` when the market already went through
    /// either terminal transition, to prevent double-processing.
    pub fn cancel(&mut self, id: MarketId, now: u64) -> Result<()> {
        let status = self.status_mut(id)?;
        if status.resolved || status.cancelled {
            return Err(EngineError::AlreadyResolved(id));
        }
        status.cancelled = true;
        status.outcome = Outcome::Void;
        status.resolved_at = Some(now);
        Ok(())
    }

    /// Undo a resolution whose follow-up transfer failed.
    ///
    /// Emulates the substrate's whole-call rollback; never exposed outside
    /// the crate, so the public one-way invariant holds.
    pub(crate) fn revert_resolution(&mut self, id: MarketId) {
        if let Some(status) = self.statuses.get_mut(id as usize) {
            status.resolved = false;
            status.cancelled = false;
            status.outcome = Outcome::Pending;
            status.winning_pool = 0;
            status.resolved_at = None;
        }
    }
}
