//! Settlement engine: market lifecycle orchestration and fee routing.
//!
//! The engine is the only component that performs external value transfers.
//! It wires the registry, the wager ledger, the payout arithmetic, and the
//! oracle evaluation together behind a small set of entry points, each of
//! which either completes all of its state changes or leaves everything
//! untouched.
//!
//! Irreversible marks (a wager claimed, a market resolved) are always
//! committed before any external transfer is issued, so a reentrant call
//! observes the post-mutation state and cannot double-spend. When a
//! transfer fails, the engine restores every record it touched before
//! returning, mirroring the substrate's whole-call rollback, so the caller
//! can simply retry later.

use crate::error::{EngineError, Result};
use crate::guard::ReentrancyGuard;
use crate::ledger::{WagerLedger, WagerRecord};
use crate::oracle::{evaluate_sample, PriceFeed, ORACLE_WINDOW_SECS};
use crate::payout::{compute_payout, PayoutSplit, BPS_DENOMINATOR};
use crate::registry::{MarketConfig, MarketRegistry, MarketStatus, Outcome, Side};
use crate::{AccountId, MarketId, EMERGENCY_GRACE_SECS, SWEEP_DORMANCY_SECS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Monotonic current-time reader, injected so tests can steer the clock.
pub trait Clock {
    /// Current Unix time in seconds.
    fn now(&self) -> u64;
}

/// Wall clock backed by [`SystemTime`], for production use.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Value-transfer capability ("send amount to recipient").
///
/// The recipient may run arbitrary code when it receives value, which is
/// why every transfer-performing entry point holds the reentrancy guard.
/// Implementations are expected to queue value moves inside the current
/// atomic operation: when the engine returns an error, the substrate
/// discards the queued moves along with the call's state changes.
pub trait Transfer {
    /// Send `amount` to `recipient`; an `Err` carries a human-readable reason.
    fn send(&mut self, recipient: &str, amount: u64) -> std::result::Result<(), String>;
}

/// Engine-wide settlement policy, injected at construction.
///
/// There is no global administrator: whoever constructs the engine decides
/// who administers it, which also makes alternate administrators trivial
/// in tests.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EngineConfig {
    /// Account allowed to create, resolve, cancel, pause, and sweep
    pub admin: AccountId,
    /// Account collecting protocol fees and unanimous/dormant pools
    pub treasury: AccountId,
    /// Protocol fee in basis points of the gross payout
    pub fee_bps: u16,
    /// Referral carve-out in basis points of the gross payout
    pub referral_bps: u16,
    /// Smallest accepted stake
    pub min_stake: u64,
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.admin.is_empty() {
            return Err(EngineError::InvalidConfig(
                "administrator account must be set".to_string(),
            ));
        }
        if self.treasury.is_empty() {
            return Err(EngineError::InvalidConfig(
                "treasury account must be set".to_string(),
            ));
        }
        if u64::from(self.fee_bps) > BPS_DENOMINATOR {
            return Err(EngineError::InvalidConfig(format!(
                "fee rate {} exceeds 100%",
                self.fee_bps
            )));
        }
        if self.referral_bps > self.fee_bps {
            return Err(EngineError::InvalidConfig(format!(
                "referral rate {} exceeds fee rate {}",
                self.referral_bps, self.fee_bps
            )));
        }
        Ok(())
    }
}

/// Where the value for a stake comes from. The two paths are mutually
/// exclusive per call by construction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Funding {
    /// Value attached directly to the call by the substrate
    Attached(u64),
    /// Debit against the participant's pre-funded internal balance
    Balance(u64),
}

impl Funding {
    /// The staked amount, regardless of source.
    pub fn amount(&self) -> u64 {
        match self {
            Funding::Attached(amount) | Funding::Balance(amount) => *amount,
        }
    }
}

/// Orchestrates market creation, staking, resolution, claiming,
/// cancellation, refunds, and fee routing.
pub struct SettlementEngine {
    config: EngineConfig,
    registry: MarketRegistry,
    ledger: WagerLedger,
    /// Pre-funded internal balances usable as an alternative stake source
    balances: HashMap<AccountId, u64>,
    /// Value already sent out per market (payouts, fees, refunds)
    paid_out: HashMap<MarketId, u64>,
    guard: ReentrancyGuard,
    paused: bool,
    feed: Box<dyn PriceFeed>,
    bank: Box<dyn Transfer>,
    clock: Box<dyn Clock>,
}

impl SettlementEngine {
    /// Build an engine from a validated policy and its injected capabilities.
    pub fn new(
        config: EngineConfig,
        feed: Box<dyn PriceFeed>,
        bank: Box<dyn Transfer>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: MarketRegistry::new(),
            ledger: WagerLedger::new(),
            balances: HashMap::new(),
            paid_out: HashMap::new(),
            guard: ReentrancyGuard::new(),
            paused: false,
            feed,
            bank,
            clock,
        })
    }

    // ---- administrative entry points ----

    /// Open a new market. Administrator-only.
    pub fn create_market(&mut self, caller: &str, config: MarketConfig) -> Result<MarketId> {
        self.require_admin(caller)?;
        let now = self.clock.now();
        if config.end_time <= now {
            return Err(EngineError::InvalidEndTime {
                end_time: config.end_time,
                now,
            });
        }
        let end_time = config.end_time;
        let id = self.registry.create(config);
        info!(market = id, end_time, "market created");
        Ok(id)
    }

    /// Resolve an oracle-backed market against a feed round. Administrator-only.
    ///
    /// An out-of-window sample fails with `InvalidOracleRound` and leaves
    /// the market open; resolution can be retried with a different round.
    pub fn resolve_with_oracle(
        &mut self,
        caller: &str,
        id: MarketId,
        round_id: u64,
    ) -> Result<Outcome> {
        self.require_admin(caller)?;
        let config = self.registry.config(id)?.clone();
        let feed_ref = config.feed.clone().ok_or(EngineError::NotOracleBacked(id))?;

        let status = self.registry.status(id)?;
        if status.resolved || status.cancelled {
            return Err(EngineError::AlreadyResolved(id));
        }
        let now = self.clock.now();
        if now < config.end_time {
            return Err(EngineError::MarketNotEnded {
                id,
                end_time: config.end_time,
                now,
            });
        }

        let sample = self.feed.round(&feed_ref, round_id)?;
        let verdict = evaluate_sample(&sample, config.end_time, config.target_price, config.direction);
        if !verdict.valid {
            return Err(EngineError::InvalidOracleRound {
                round_id,
                sample_time: sample.timestamp,
                end_time: config.end_time,
                window: ORACLE_WINDOW_SECS,
            });
        }

        info!(
            market = id,
            round = round_id,
            price = verdict.price,
            "oracle round accepted"
        );
        self.finish_resolution(id, verdict.winner, now)
    }

    /// Resolve a manually-settled market with a direct decision. Administrator-only.
    pub fn resolve_manual(&mut self, caller: &str, id: MarketId, winner: Side) -> Result<Outcome> {
        self.require_admin(caller)?;
        let config = self.registry.config(id)?;
        if config.feed.is_some() {
            return Err(EngineError::OracleBacked(id));
        }
        let end_time = config.end_time;

        let status = self.registry.status(id)?;
        if status.resolved || status.cancelled {
            return Err(EngineError::AlreadyResolved(id));
        }
        let now = self.clock.now();
        if now < end_time {
            return Err(EngineError::MarketNotEnded { id, end_time, now });
        }
        self.finish_resolution(id, winner, now)
    }

    /// Void a market. Administrator-only; no funds move until participants
    /// withdraw their refunds.
    pub fn cancel_market(&mut self, caller: &str, id: MarketId) -> Result<()> {
        self.require_admin(caller)?;
        let now = self.clock.now();
        self.registry.cancel(id, now)?;
        info!(market = id, "market cancelled");
        Ok(())
    }

    /// Pause or unpause staking across all markets. Administrator-only.
    pub fn set_paused(&mut self, caller: &str, paused: bool) -> Result<()> {
        self.require_admin(caller)?;
        self.paused = paused;
        warn!(paused, "staking pause toggled");
        Ok(())
    }

    /// Reclaim the unclaimed residue of a long-resolved market for the
    /// treasury. Administrator-only, and only once the dormancy period has
    /// elapsed since resolution. Returns the swept amount.
    pub fn sweep_unclaimed(&mut self, caller: &str, id: MarketId) -> Result<u64> {
        self.require_admin(caller)?;
        self.guard.enter()?;
        let result = self.sweep_locked(id);
        self.guard.exit();
        result
    }

    // ---- open entry points ----

    /// Pre-fund an internal balance from value attached to the call.
    pub fn deposit(&mut self, caller: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        *self.balances.entry(caller.to_string()).or_default() += amount;
        info!(participant = caller, amount, "balance deposited");
        Ok(())
    }

    /// Withdraw unused internal balance back to the participant.
    pub fn withdraw_balance(&mut self, caller: &str, amount: u64) -> Result<()> {
        self.guard.enter()?;
        let result = self.withdraw_balance_locked(caller, amount);
        self.guard.exit();
        result
    }

    /// Stake on one side of an open market.
    ///
    /// The stake must meet the configured minimum and arrive before the
    /// market's end time. Funding is either value attached to the call or
    /// a debit against the participant's internal balance, never both.
    pub fn stake(
        &mut self,
        caller: &str,
        id: MarketId,
        side: Side,
        funding: Funding,
        referrer: Option<&str>,
    ) -> Result<()> {
        if self.paused {
            return Err(EngineError::Paused);
        }
        let amount = funding.amount();
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if amount < self.config.min_stake {
            return Err(EngineError::StakeTooSmall {
                amount,
                minimum: self.config.min_stake,
            });
        }
        if matches!(funding, Funding::Balance(_)) {
            let available = self.balance_of(caller);
            if available < amount {
                return Err(EngineError::InsufficientBalance {
                    available,
                    required: amount,
                });
            }
        }

        // The registry enforces the open-state and end-time checks; nothing
        // is debited until it accepts the stake.
        let now = self.clock.now();
        self.registry.record_stake(id, side, amount, now)?;

        if matches!(funding, Funding::Balance(_)) {
            if let Some(balance) = self.balances.get_mut(caller) {
                *balance -= amount;
            }
        }
        self.ledger.record_wager(id, caller, side, amount, referrer);

        info!(market = id, participant = caller, ?side, amount, "stake recorded");
        Ok(())
    }

    /// Collect a winning payout. Once per participant per market.
    pub fn claim(&mut self, caller: &str, id: MarketId) -> Result<PayoutSplit> {
        self.guard.enter()?;
        let result = self.claim_locked(caller, id);
        self.guard.exit();
        result
    }

    /// Void an abandoned market whose administrator never resolved it.
    ///
    /// Callable by anyone once the grace period after the end time has
    /// elapsed, so funds cannot be stranded by an unresponsive
    /// administrator. Functionally equivalent to cancellation.
    pub fn emergency_refund(&mut self, caller: &str, id: MarketId) -> Result<()> {
        let end_time = self.registry.config(id)?.end_time;
        let now = self.clock.now();
        let available_at = end_time + EMERGENCY_GRACE_SECS;
        if now < available_at {
            return Err(EngineError::GracePeriodActive {
                id,
                available_at,
                now,
            });
        }
        self.registry.cancel(id, now)?;
        warn!(market = id, caller, "emergency refund: market voided");
        Ok(())
    }

    /// Withdraw the full recorded stake from a cancelled or void market.
    /// Once per participant per market; returns the refunded amount.
    pub fn withdraw_refund(&mut self, caller: &str, id: MarketId) -> Result<u64> {
        self.guard.enter()?;
        let result = self.withdraw_refund_locked(caller, id);
        self.guard.exit();
        result
    }

    // ---- read-only accessors ----

    /// The engine's settlement policy.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Immutable terms of a market.
    pub fn market_config(&self, id: MarketId) -> Result<&MarketConfig> {
        self.registry.config(id)
    }

    /// Current status of a market.
    pub fn market_status(&self, id: MarketId) -> Result<&MarketStatus> {
        self.registry.status(id)
    }

    /// A participant's wager record on a market, if any.
    pub fn wager(&self, id: MarketId, participant: &str) -> Option<&WagerRecord> {
        self.ledger.wager(id, participant)
    }

    /// A participant's unused internal balance.
    pub fn balance_of(&self, participant: &str) -> u64 {
        self.balances.get(participant).copied().unwrap_or(0)
    }

    /// Number of markets ever created.
    pub fn market_count(&self) -> usize {
        self.registry.len()
    }

    /// Value already paid out of a market's pool (payouts, fees, refunds).
    pub fn paid_out_of(&self, id: MarketId) -> u64 {
        self.paid_out.get(&id).copied().unwrap_or(0)
    }

    /// Whether staking is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ---- internals ----

    fn require_admin(&self, caller: &str) -> Result<()> {
        if caller != self.config.admin {
            return Err(EngineError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    fn send(&mut self, recipient: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.bank
            .send(recipient, amount)
            .map_err(|reason| EngineError::TransferFailed {
                recipient: recipient.to_string(),
                amount,
                reason,
            })
    }

    fn finish_resolution(&mut self, id: MarketId, winner: Side, now: u64) -> Result<Outcome> {
        let status = self.registry.status(id)?;
        let winning_pool = status.side_total(winner);
        let total_pool = status.total_pool;
        let outcome = Outcome::from(winner);

        if winning_pool == 0 && total_pool > 0 {
            // Nobody staked the winning side: the pool goes to the treasury
            // in full and no claims are possible on this market. The guard
            // is taken before the resolution is committed so a reentrant
            // call leaves the market untouched and retryable.
            self.guard.enter()?;
            let settled = self.settle_unanimous(id, outcome, total_pool, now);
            self.guard.exit();
            settled?;
            warn!(market = id, pool = total_pool, "unanimous market; pool routed to treasury");
        } else {
            self.registry.resolve(id, outcome, winning_pool, now)?;
        }

        info!(market = id, ?outcome, winning_pool, "market resolved");
        Ok(outcome)
    }

    fn settle_unanimous(
        &mut self,
        id: MarketId,
        outcome: Outcome,
        total_pool: u64,
        now: u64,
    ) -> Result<()> {
        self.registry.resolve(id, outcome, 0, now)?;
        *self.paid_out.entry(id).or_default() += total_pool;

        let treasury = self.config.treasury.clone();
        if let Err(err) = self.send(&treasury, total_pool) {
            if let Some(paid) = self.paid_out.get_mut(&id) {
                *paid -= total_pool;
            }
            self.registry.revert_resolution(id);
            return Err(err);
        }
        Ok(())
    }

    fn claim_locked(&mut self, caller: &str, id: MarketId) -> Result<PayoutSplit> {
        let status = self.registry.status(id)?;
        if status.cancelled || status.outcome == Outcome::Void {
            return Err(EngineError::MarketVoided(id));
        }
        if !status.resolved {
            return Err(EngineError::NotResolved(id));
        }
        let winning_side = match status.outcome {
            Outcome::Yes => Side::Yes,
            Outcome::No => Side::No,
            Outcome::Pending | Outcome::Void => return Err(EngineError::NotResolved(id)),
        };
        let total_pool = status.total_pool;
        let winning_pool = status.winning_pool;

        let record = self
            .ledger
            .wager(id, caller)
            .cloned()
            .ok_or_else(|| EngineError::NoStake {
                market: id,
                participant: caller.to_string(),
            })?;
        if record.claimed {
            return Err(EngineError::AlreadyClaimed {
                market: id,
                participant: caller.to_string(),
            });
        }
        let stake = record.amount_on(winning_side);
        if stake == 0 {
            return Err(EngineError::NoStake {
                market: id,
                participant: caller.to_string(),
            });
        }

        // A claimable stake implies a non-empty winning pool; the empty
        // case is settled at resolution time and never reaches here.
        let split = compute_payout(
            stake,
            total_pool,
            winning_pool,
            self.config.fee_bps,
            self.config.referral_bps,
            record.referrer.is_some(),
        );

        // Commit the irreversible mark before any external transfer.
        self.ledger.mark_claimed(id, caller)?;
        *self.paid_out.entry(id).or_default() += split.gross;

        if let Err(err) = self.pay_claim(caller, &record, &split) {
            // Restore pre-call state so the participant can retry later.
            self.ledger.revert_claim(id, caller);
            if let Some(paid) = self.paid_out.get_mut(&id) {
                *paid -= split.gross;
            }
            return Err(err);
        }

        info!(
            market = id,
            participant = caller,
            net = split.net,
            admin_fee = split.admin_fee,
            referral_fee = split.referral_fee,
            "claim paid"
        );
        Ok(split)
    }

    fn pay_claim(&mut self, caller: &str, record: &WagerRecord, split: &PayoutSplit) -> Result<()> {
        self.send(caller, split.net)?;
        if split.admin_fee > 0 {
            let treasury = self.config.treasury.clone();
            self.send(&treasury, split.admin_fee)?;
        }
        if split.referral_fee > 0 {
            if let Some(referrer) = record.referrer.clone() {
                self.send(&referrer, split.referral_fee)?;
            }
        }
        Ok(())
    }

    fn withdraw_refund_locked(&mut self, caller: &str, id: MarketId) -> Result<u64> {
        let status = self.registry.status(id)?;
        if !status.cancelled && status.outcome != Outcome::Void {
            return Err(EngineError::NotCancelled(id));
        }

        let record = self
            .ledger
            .wager(id, caller)
            .cloned()
            .ok_or_else(|| EngineError::NoStake {
                market: id,
                participant: caller.to_string(),
            })?;
        let refund = record.total();
        if refund == 0 {
            return Err(EngineError::NoStake {
                market: id,
                participant: caller.to_string(),
            });
        }

        self.ledger.mark_claimed(id, caller)?;
        *self.paid_out.entry(id).or_default() += refund;

        if let Err(err) = self.send(caller, refund) {
            self.ledger.revert_claim(id, caller);
            if let Some(paid) = self.paid_out.get_mut(&id) {
                *paid -= refund;
            }
            return Err(err);
        }

        info!(market = id, participant = caller, refund, "void refund paid");
        Ok(refund)
    }

    fn withdraw_balance_locked(&mut self, caller: &str, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        let available = self.balance_of(caller);
        if available < amount {
            return Err(EngineError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        // Debit before the transfer so a reentrant view cannot double-spend.
        if let Some(balance) = self.balances.get_mut(caller) {
            *balance -= amount;
        }
        if let Err(err) = self.send(caller, amount) {
            *self.balances.entry(caller.to_string()).or_default() += amount;
            return Err(err);
        }
        info!(participant = caller, amount, "balance withdrawn");
        Ok(())
    }

    fn sweep_locked(&mut self, id: MarketId) -> Result<u64> {
        let status = self.registry.status(id)?;
        if !status.resolved {
            return Err(EngineError::NotResolved(id));
        }
        let resolved_at = status.resolved_at.unwrap_or_default();
        let total_pool = status.total_pool;

        let now = self.clock.now();
        let available_at = resolved_at + SWEEP_DORMANCY_SECS;
        if now < available_at {
            return Err(EngineError::DormancyActive {
                id,
                available_at,
                now,
            });
        }

        let residual = total_pool.saturating_sub(self.paid_out_of(id));
        if residual == 0 {
            return Ok(0);
        }

        *self.paid_out.entry(id).or_default() += residual;
        let treasury = self.config.treasury.clone();
        if let Err(err) = self.send(&treasury, residual) {
            if let Some(paid) = self.paid_out.get_mut(&id) {
                *paid -= residual;
            }
            return Err(err);
        }
        info!(market = id, residual, "dormant residue swept to treasury");
        Ok(residual)
    }
}

#[cfg(test)]
impl SettlementEngine {
    /// Simulate an in-flight external transfer for reentrancy tests.
    pub(crate) fn lock_guard_for_test(&mut self) {
        self.guard.enter().unwrap();
    }
}
