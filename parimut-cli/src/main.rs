//! # Parimut CLI
//!
//! Command-line front-end for the parimut settlement engine: payout quotes,
//! oracle-window checks, and a scripted in-memory market session.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use parimut_core::{
    compute_payout, evaluate_sample, utils::*, Clock, Direction, EngineConfig, EngineError,
    Funding, MarketConfig, PriceFeed, PriceSample, SettlementEngine, Side, Transfer,
    ORACLE_WINDOW_SECS,
};

#[derive(Parser)]
#[command(name = "parimut")]
#[command(about = "Pari-mutuel settlement engine for binary wagering markets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote the payout split for a winning stake
    Quote {
        /// Stake on the winning side
        #[arg(short, long)]
        stake: u64,
        /// Total pool across both sides
        #[arg(short, long)]
        total: u64,
        /// Total staked on the winning side
        #[arg(short, long)]
        winning: u64,
        /// Protocol fee in basis points
        #[arg(short, long, default_value = "500")]
        fee_bps: u16,
        /// Referral carve-out in basis points
        #[arg(short, long, default_value = "100")]
        referral_bps: u16,
        /// Quote as if the wager carries a referrer
        #[arg(long)]
        referred: bool,
    },
    /// Check whether an oracle sample falls inside the acceptance window
    Window {
        /// Market end time (Unix timestamp)
        #[arg(short, long)]
        end_time: u64,
        /// Sample timestamp (Unix timestamp)
        #[arg(short, long)]
        sample_time: u64,
    },
    /// Run a scripted market session in memory, printing every step
    Demo,
    /// Format a Unix timestamp as a human-readable date
    FormatTime {
        /// Unix timestamp
        timestamp: u64,
    },
}

/// Clock the demo script can steer past the market's end time.
#[derive(Clone, Default)]
struct DemoClock {
    now: Rc<Cell<u64>>,
}

impl Clock for DemoClock {
    fn now(&self) -> u64 {
        self.now.get()
    }
}

/// Transfer sink that narrates every value move.
struct ConsoleBank;

impl Transfer for ConsoleBank {
    fn send(&mut self, recipient: &str, amount: u64) -> Result<(), String> {
        println!(
            "  {} {} -> {}",
            "transfer".bright_black(),
            amount.to_string().yellow(),
            recipient.cyan()
        );
        Ok(())
    }
}

/// The demo market is resolved manually; the feed is never consulted.
struct NoFeed;

impl PriceFeed for NoFeed {
    fn round(&self, feed: &str, round_id: u64) -> parimut_core::Result<PriceSample> {
        Err(EngineError::FeedUnavailable {
            feed: feed.to_string(),
            round_id,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quote {
            stake,
            total,
            winning,
            fee_bps,
            referral_bps,
            referred,
        } => {
            if winning == 0 || winning > total {
                println!(
                    "{}: winning pool must be nonzero and no larger than the total pool",
                    "Error".red().bold()
                );
                return Ok(());
            }
            let split = compute_payout(stake, total, winning, fee_bps, referral_bps, referred);

            println!("{}", "Payout Quote".green().bold());
            println!("{}", "═".repeat(40).bright_black());
            println!("{}: {}", "Gross".yellow().bold(), split.gross);
            println!("{}: {}", "Net payout".cyan().bold(), split.net);
            println!("{}: {}", "Treasury fee".yellow().bold(), split.admin_fee);
            println!("{}: {}", "Referral fee".yellow().bold(), split.referral_fee);
            println!("{}: {}", "Fee rate".yellow().bold(), format_bps(fee_bps));
        }

        Commands::Window {
            end_time,
            sample_time,
        } => {
            let sample = PriceSample {
                price: 0,
                timestamp: sample_time,
            };
            let verdict = evaluate_sample(&sample, end_time, 0, Direction::AtOrAbove);

            if verdict.valid {
                println!(
                    "{}: sample at {} is {} for a market ending {}",
                    "Window Check".green().bold(),
                    format_timestamp(sample_time).cyan(),
                    "valid".green(),
                    format_timestamp(end_time).yellow()
                );
            } else {
                println!(
                    "{}: sample at {} is {} (outside +/-{}h of {})",
                    "Window Check".red().bold(),
                    format_timestamp(sample_time).cyan(),
                    "invalid".red(),
                    ORACLE_WINDOW_SECS / 3600,
                    format_timestamp(end_time).yellow()
                );
            }
        }

        Commands::Demo => run_demo()?,

        Commands::FormatTime { timestamp } => {
            println!(
                "{}: {}",
                "Formatted".green().bold(),
                format_timestamp(timestamp).cyan()
            );
        }
    }

    Ok(())
}

/// Scripted end-to-end session: create, stake, resolve, claim.
fn run_demo() -> Result<()> {
    let end_time: u64 = 1_735_689_600;
    let clock = DemoClock::default();
    clock.now.set(end_time - 3_600);

    let mut engine = SettlementEngine::new(
        EngineConfig {
            admin: "admin".to_string(),
            treasury: "treasury".to_string(),
            fee_bps: 500,
            referral_bps: 100,
            min_stake: 10,
        },
        Box::new(NoFeed),
        Box::new(ConsoleBank),
        Box::new(clock.clone()),
    )?;

    println!("{}", "Opening market...".green().bold());
    let market = engine.create_market(
        "admin",
        MarketConfig {
            question: "Will the home team win tonight?".to_string(),
            metadata: String::new(),
            end_time,
            target_price: 0,
            feed: None,
            settlement_asset: "usd-token".to_string(),
            direction: Direction::AtOrAbove,
        },
    )?;
    let config = engine.market_config(market)?;
    println!("{}: {}", "Market".yellow().bold(), market);
    println!("{}: {}", "Question".yellow().bold(), config.question);
    println!("{}: {}", "Ends".yellow().bold(), format_timestamp(end_time));
    println!();

    println!("{}", "Placing stakes...".green().bold());
    engine.stake("alice", market, Side::Yes, Funding::Attached(100), Some("ivan"))?;
    println!("  alice stakes {} on Yes (referred by ivan)", "100".yellow());
    engine.stake("bob", market, Side::No, Funding::Attached(300), None)?;
    println!("  bob stakes {} on No", "300".yellow());

    let status = engine.market_status(market)?;
    println!(
        "{}: {} Yes / {} No ({} total)",
        "Pools".yellow().bold(),
        status.total_yes,
        status.total_no,
        status.total_pool
    );
    println!();

    println!("{}", "Resolving after the end time...".green().bold());
    clock.now.set(end_time + 60);
    let outcome = engine.resolve_manual("admin", market, Side::Yes)?;
    println!("{}: {:?}", "Outcome".cyan().bold(), outcome);
    println!();

    println!("{}", "Claiming...".green().bold());
    let split = engine.claim("alice", market)?;
    println!(
        "{}: {}",
        "alice's split".cyan().bold(),
        serde_json::to_string_pretty(&split)?
    );
    match engine.claim("bob", market) {
        Err(EngineError::NoStake { .. }) => {
            println!("  bob staked the losing side; nothing to claim")
        }
        other => println!("  unexpected: {other:?}"),
    }
    println!();
    println!(
        "{}",
        "Session complete: pool fully settled.".bright_blue()
    );
    Ok(())
}
