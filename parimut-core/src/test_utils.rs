//! Common test utilities for parimut-core tests.
//!
//! Deterministic stand-ins for the injected substrate: a settable clock, a
//! static price feed, and a recording transfer sink that can simulate
//! failures. Handles are shared `Rc`s so a test keeps a view into the
//! fakes after boxing them into the engine.

use crate::engine::{Clock, EngineConfig, SettlementEngine, Transfer};
use crate::error::{EngineError, Result};
use crate::oracle::{Direction, PriceFeed, PriceSample};
use crate::registry::MarketConfig;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Common test constants
pub mod constants {
    /// Standard administrator account
    pub const ADMIN: &str = "admin";

    /// Standard treasury account
    pub const TREASURY: &str = "treasury";

    /// Standard feed reference for oracle-backed markets
    pub const FEED: &str = "btc-usd";

    /// Standard market end time (Jan 1, 2025)
    pub const END_TIME: u64 = 1_735_689_600;

    /// Standard target price
    pub const TARGET_PRICE: u64 = 50_000;

    /// Standard protocol fee (5%)
    pub const FEE_BPS: u16 = 500;

    /// Standard referral carve-out (1%)
    pub const REFERRAL_BPS: u16 = 100;

    /// Standard minimum stake
    pub const MIN_STAKE: u64 = 10;
}

/// Clock whose current time a test can set and advance.
#[derive(Clone, Default)]
pub struct TestClock {
    now: Rc<Cell<u64>>,
}

impl TestClock {
    pub fn at(now: u64) -> Self {
        let clock = Self::default();
        clock.set(now);
        clock
    }

    pub fn set(&self, now: u64) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for TestClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

/// Price feed serving a fixed table of rounds.
#[derive(Clone, Default)]
pub struct StaticFeed {
    rounds: Rc<RefCell<HashMap<(String, u64), PriceSample>>>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, feed: &str, round_id: u64, price: u64, timestamp: u64) {
        self.rounds
            .borrow_mut()
            .insert((feed.to_string(), round_id), PriceSample { price, timestamp });
    }
}

impl PriceFeed for StaticFeed {
    fn round(&self, feed: &str, round_id: u64) -> Result<PriceSample> {
        self.rounds
            .borrow()
            .get(&(feed.to_string(), round_id))
            .copied()
            .ok_or_else(|| EngineError::FeedUnavailable {
                feed: feed.to_string(),
                round_id,
            })
    }
}

/// Transfer sink that records every send and can simulate failures for
/// chosen recipients.
#[derive(Clone, Default)]
pub struct RecordingBank {
    sent: Rc<RefCell<Vec<(String, u64)>>>,
    failing: Rc<RefCell<HashSet<String>>>,
}

impl RecordingBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transfer to `recipient` fail until restored.
    pub fn fail_transfers_to(&self, recipient: &str) {
        self.failing.borrow_mut().insert(recipient.to_string());
    }

    /// Let transfers to `recipient` succeed again.
    pub fn restore(&self, recipient: &str) {
        self.failing.borrow_mut().remove(recipient);
    }

    /// Every recorded transfer, in order.
    pub fn sent(&self) -> Vec<(String, u64)> {
        self.sent.borrow().clone()
    }

    /// Total value successfully sent to one recipient.
    pub fn total_to(&self, recipient: &str) -> u64 {
        self.sent
            .borrow()
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Total value successfully sent to anyone.
    pub fn total_sent(&self) -> u64 {
        self.sent.borrow().iter().map(|(_, amount)| amount).sum()
    }
}

impl Transfer for RecordingBank {
    fn send(&mut self, recipient: &str, amount: u64) -> std::result::Result<(), String> {
        if self.failing.borrow().contains(recipient) {
            return Err("recipient rejected the transfer".to_string());
        }
        self.sent.borrow_mut().push((recipient.to_string(), amount));
        Ok(())
    }
}

/// An engine wired to the deterministic fakes, plus handles into them.
pub struct TestBench {
    pub engine: SettlementEngine,
    pub clock: TestClock,
    pub feed: StaticFeed,
    pub bank: RecordingBank,
}

/// Standard engine policy used across tests.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        admin: constants::ADMIN.to_string(),
        treasury: constants::TREASURY.to_string(),
        fee_bps: constants::FEE_BPS,
        referral_bps: constants::REFERRAL_BPS,
        min_stake: constants::MIN_STAKE,
    }
}

/// Build an engine on the standard policy, with the clock set well before
/// the standard end time.
pub fn test_bench() -> TestBench {
    test_bench_with_config(test_engine_config())
}

pub fn test_bench_with_config(config: EngineConfig) -> TestBench {
    let clock = TestClock::at(constants::END_TIME - 1_000);
    let feed = StaticFeed::new();
    let bank = RecordingBank::new();
    let engine = SettlementEngine::new(
        config,
        Box::new(feed.clone()),
        Box::new(bank.clone()),
        Box::new(clock.clone()),
    )
    .unwrap();
    TestBench {
        engine,
        clock,
        feed,
        bank,
    }
}

/// Terms for a standard oracle-backed market.
pub fn oracle_market_config() -> MarketConfig {
    MarketConfig {
        question: "Will BTC settle at or above 50k?".to_string(),
        metadata: "ipfs://market-meta".to_string(),
        end_time: constants::END_TIME,
        target_price: constants::TARGET_PRICE,
        feed: Some(constants::FEED.to_string()),
        settlement_asset: "usd-token".to_string(),
        direction: Direction::AtOrAbove,
    }
}

/// Terms for a standard manually-resolved market.
pub fn manual_market_config() -> MarketConfig {
    MarketConfig {
        feed: None,
        question: "Will the election be called by midnight?".to_string(),
        ..oracle_market_config()
    }
}
