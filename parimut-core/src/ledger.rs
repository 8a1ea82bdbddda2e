//! Per-participant wager records and referral attribution.
//!
//! Records are keyed by market and participant, created lazily on first
//! stake, and updated additively until the market leaves the open state.
//! The first non-empty referrer attached to a wager wins and is immutable
//! afterwards; self-referral is ignored.

use crate::error::{EngineError, Result};
use crate::registry::Side;
use crate::{AccountId, MarketId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A participant's accumulated position on one market.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WagerRecord {
    pub yes_amount: u64,
    pub no_amount: u64,
    /// Whoever referred this participant, set once on first attribution
    pub referrer: Option<AccountId>,
    /// Set exactly once when the payout or refund is collected
    pub claimed: bool,
}

impl WagerRecord {
    /// Combined stake across both sides.
    pub fn total(&self) -> u64 {
        self.yes_amount + self.no_amount
    }

    /// Stake on the given side.
    pub fn amount_on(&self, side: Side) -> u64 {
        match side {
            Side::Yes => self.yes_amount,
            Side::No => self.no_amount,
        }
    }
}

/// All wager records, keyed by market and participant.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WagerLedger {
    wagers: HashMap<(MarketId, AccountId), WagerRecord>,
}

impl WagerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stake to a participant's record, creating it if needed.
    ///
    /// The referrer is attached only when the record has none yet and the
    /// referrer is not the participant themselves.
    pub fn record_wager(
        &mut self,
        market: MarketId,
        participant: &str,
        side: Side,
        amount: u64,
        referrer: Option<&str>,
    ) {
        let record = self
            .wagers
            .entry((market, participant.to_string()))
            .or_default();

        match side {
            Side::Yes => record.yes_amount += amount,
            Side::No => record.no_amount += amount,
        }

        if record.referrer.is_none() {
            if let Some(referrer) = referrer {
                if !referrer.is_empty() && referrer != participant {
                    record.referrer = Some(referrer.to_string());
                }
            }
        }
    }

    /// Look up a participant's record on a market.
    pub fn wager(&self, market: MarketId, participant: &str) -> Option<&WagerRecord> {
        self.wagers.get(&(market, participant.to_string()))
    }

    /// Mark a wager as claimed; one-way, exactly once.
    pub fn mark_claimed(&mut self, market: MarketId, participant: &str) -> Result<()> {
        let record = self
            .wagers
            .get_mut(&(market, participant.to_string()))
            .ok_or_else(|| EngineError::NoStake {
                market,
                participant: participant.to_string(),
            })?;

        if record.claimed {
            return Err(EngineError::AlreadyClaimed {
                market,
                participant: participant.to_string(),
            });
        }
        record.claimed = true;
        Ok(())
    }

    /// Undo a claim whose payout transfer failed.
    ///
    /// Emulates the substrate's whole-call rollback; crate-private so the
    /// public once-only invariant holds.
    pub(crate) fn revert_claim(&mut self, market: MarketId, participant: &str) {
        if let Some(record) = self.wagers.get_mut(&(market, participant.to_string())) {
            record.claimed = false;
        }
    }

    /// Iterate over all records for one market.
    pub fn wagers_in(&self, market: MarketId) -> impl Iterator<Item = (&str, &WagerRecord)> {
        self.wagers
            .iter()
            .filter(move |((m, _), _)| *m == market)
            .map(|((_, participant), record)| (participant.as_str(), record))
    }

    /// Iterate over one participant's records across all markets.
    pub fn wagers_for<'a>(
        &'a self,
        participant: &'a str,
    ) -> impl Iterator<Item = (MarketId, &'a WagerRecord)> + 'a {
        self.wagers
            .iter()
            .filter(move |((_, p), _)| p == participant)
            .map(|((market, _), record)| (*market, record))
    }
}
