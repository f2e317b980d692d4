//! Rate-limited poll scheduler.
//!
//! Walks the [`SymbolSet`] one symbol at a time, fetching each quote and
//! broadcasting it immediately, with a fixed pause between consecutive
//! fetches so the upstream requests-per-minute ceiling is never exceeded.
//! Cycles repeat on a fixed cadence measured from when each cycle was
//! scheduled, not from when the previous one finished.
//!
//! # State machine
//!
//! ```text
//!   Idle ──tick──▶ Fetching(0) ──▶ Waiting(0) ──delay──▶ Fetching(1) ─ … ─▶ Fetching(n-1)
//!    ▲                                                                        │
//!    └────────────────────────── CycleComplete ◀──────────────────────────────┘
//! ```
//!
//! Fetches are strictly sequential. A failed fetch moves on to the next
//! symbol after the same delay as a successful one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::constants::rate_limits;
use crate::error::{RelayError, Result};
use crate::fetcher::QuoteFetcher;
use crate::types::SymbolSet;
use crate::ws::broadcaster::Broadcaster;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Delays that drive the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Pause between two consecutive fetches inside a cycle.
    pub inter_symbol_delay: Duration,
    /// Time between two cycle starts.
    pub cycle_interval: Duration,
    /// Wait before the first cycle.
    pub initial_delay: Duration,
}

impl PollTiming {
    /// Inter-symbol delay that keeps a sequential poller under
    /// `requests_per_minute` (5/min → 12 s).
    pub fn delay_for_rate(requests_per_minute: u32) -> Result<Duration> {
        if requests_per_minute == 0 {
            return Err(RelayError::Config(
                "requests per minute must be greater than zero".into(),
            ));
        }
        Ok(Duration::from_secs(60) / requests_per_minute)
    }

    /// Total time one cycle spends waiting between fetches.
    pub fn cycle_wait(&self, symbol_count: usize) -> Duration {
        let gaps = u32::try_from(symbol_count.saturating_sub(1)).unwrap_or(u32::MAX);
        self.inter_symbol_delay.saturating_mul(gaps)
    }

    /// Upstream calls per day at this cadence (rounded up to whole cycles).
    pub fn requests_per_day(&self, symbol_count: usize) -> u64 {
        let interval_ms = self.cycle_interval.as_millis().max(1);
        let cycles = DAY.as_millis().div_ceil(interval_ms);
        u64::try_from(cycles.saturating_mul(symbol_count as u128)).unwrap_or(u64::MAX)
    }
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next cycle to be due.
    Idle,
    /// Fetching (and then broadcasting) the symbol at this index.
    Fetching(usize),
    /// Done with the symbol at this index, sleeping before the next one.
    Waiting(usize),
    /// The last symbol of the cycle has been handled.
    CycleComplete,
}

/// Run-state of the cycle in progress.
#[derive(Debug, Clone, Copy)]
struct PollCycle {
    index: usize,
    started_at: DateTime<Utc>,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Fetches issued; always the size of the symbol set.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Sum over broadcast quotes of the connections each was queued on.
    pub delivered: usize,
    /// Connections pruned by this cycle's broadcasts.
    pub pruned: usize,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            delivered: 0,
            pruned: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// PollScheduler
// ---------------------------------------------------------------------------

/// Drives fetches across the symbol set and hands every quote to the
/// [`Broadcaster`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use quote_relay::client::QuoteClient;
/// use quote_relay::scheduler::{PollScheduler, PollTiming};
/// use quote_relay::types::SymbolSet;
/// use quote_relay::ws::broadcaster::Broadcaster;
/// use quote_relay::ws::registry::ConnectionRegistry;
///
/// # #[tokio::main]
/// # async fn main() -> quote_relay::error::Result<()> {
/// let registry = Arc::new(ConnectionRegistry::new());
/// let scheduler = PollScheduler::new(
///     QuoteClient::new("your-api-key")?,
///     Broadcaster::new(registry),
///     SymbolSet::parse("AAPL,GOOGL")?,
///     PollTiming {
///         inter_symbol_delay: PollTiming::delay_for_rate(5)?,
///         cycle_interval: Duration::from_secs(3600),
///         initial_delay: Duration::from_secs(60),
///     },
/// )?;
/// let report = scheduler.run_cycle().await;
/// println!("{} of {} symbols updated", report.succeeded, report.attempted);
/// # Ok(())
/// # }
/// ```
pub struct PollScheduler<F> {
    fetcher: F,
    broadcaster: Broadcaster,
    symbols: SymbolSet,
    timing: PollTiming,
    state: watch::Sender<SchedulerState>,
}

impl<F: QuoteFetcher> PollScheduler<F> {
    /// Create a scheduler. Fails if `cycle_interval` is zero.
    pub fn new(
        fetcher: F,
        broadcaster: Broadcaster,
        symbols: SymbolSet,
        timing: PollTiming,
    ) -> Result<Self> {
        if timing.cycle_interval.is_zero() {
            return Err(RelayError::Config("cycle interval must be non-zero".into()));
        }
        let (state, _) = watch::channel(SchedulerState::Idle);
        Ok(Self {
            fetcher,
            broadcaster,
            symbols,
            timing,
            state,
        })
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run one full cycle over the symbol set.
    ///
    /// Issues exactly `symbols.len()` fetches in order, broadcasting each
    /// successful quote before the next fetch starts. Never fails: upstream
    /// and broadcast errors are logged and counted.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut cycle = PollCycle {
            index: 0,
            started_at: Utc::now(),
        };
        let mut report = CycleReport::new(cycle.started_at);
        let last = self.symbols.len().saturating_sub(1);

        tracing::info!(symbols = self.symbols.len(), "Poll cycle started");

        for (i, symbol) in self.symbols.iter().enumerate() {
            cycle.index = i;
            self.set_state(SchedulerState::Fetching(cycle.index));
            report.attempted += 1;

            match self.fetcher.fetch(symbol).await {
                Ok(quote) => {
                    report.succeeded += 1;
                    match self.broadcaster.broadcast(&quote) {
                        Ok(sent) => {
                            report.delivered += sent.delivered;
                            report.pruned += sent.pruned;
                            tracing::info!(
                                %symbol,
                                price = %quote.price,
                                delivered = sent.delivered,
                                "Quote updated"
                            );
                        }
                        Err(e) => {
                            tracing::error!(%symbol, error = %e, "Failed to encode quote");
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(%symbol, error = %e, "Quote fetch failed, skipping symbol this cycle");
                }
            }

            if i < last {
                self.set_state(SchedulerState::Waiting(cycle.index));
                tokio::time::sleep(self.timing.inter_symbol_delay).await;
            }
        }

        self.set_state(SchedulerState::CycleComplete);
        tracing::info!(
            started_at = %cycle.started_at,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            delivered = report.delivered,
            "Poll cycle complete"
        );
        report
    }

    /// Run cycles forever: the first after `initial_delay`, then one every
    /// `cycle_interval`.
    ///
    /// Cycles never run concurrently. If a cycle overruns the interval, the
    /// next cycle starts as soon as it ends, any further missed ticks are
    /// dropped, and the cadence then resumes on the original grid.
    pub async fn run(self) {
        let wait = self.timing.cycle_wait(self.symbols.len());
        if wait >= self.timing.cycle_interval {
            tracing::warn!(
                ?wait,
                cycle_interval = ?self.timing.cycle_interval,
                "Inter-symbol delays alone exceed the cycle interval; cycles will be skipped"
            );
        }

        let per_day = self.timing.requests_per_day(self.symbols.len());
        if per_day > u64::from(rate_limits::FREE_TIER_PER_DAY) {
            tracing::warn!(
                per_day,
                free_tier = rate_limits::FREE_TIER_PER_DAY,
                "Schedule exceeds the free-tier daily request budget"
            );
        }

        tracing::info!(
            symbols = %self.symbols,
            initial_delay = ?self.timing.initial_delay,
            inter_symbol_delay = ?self.timing.inter_symbol_delay,
            cycle_interval = ?self.timing.cycle_interval,
            "Poll scheduler started"
        );

        let first = Instant::now() + self.timing.initial_delay;
        let mut ticker = tokio::time::interval_at(first, self.timing.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            self.set_state(SchedulerState::Idle);
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }
}

impl<F: QuoteFetcher + 'static> PollScheduler<F> {
    /// Run the scheduler on a background task for the life of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
