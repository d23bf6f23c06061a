//! RTP backtesting.
//!
//! Replays many equal-stake rounds through the round engine with a fixed
//! "cash out at lane N" strategy and measures the return to player.
//! The closed-form expectation of the same strategy is provided as well,
//! so simulated figures can be checked against it.

use rand::Rng;
use rust_decimal::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::round::{Outcome, RoundEngine};
use crate::types::{Difficulty, GameError, RoundState};

// ---------------------------------------------------------------------------
// Strategy & report
// ---------------------------------------------------------------------------

/// Cash out as soon as `target_lane` is reached (or at the far side
/// when the target is beyond it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CashOutStrategy {
    pub difficulty: Difficulty,
    pub target_lane: u32,
}

/// Outcome of a backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct RtpReport {
    pub strategy: CashOutStrategy,
    pub rounds: u64,
    pub rounds_won: u64,
    pub rounds_busted: u64,
    pub total_wagered: Decimal,
    pub total_returned: Decimal,
    /// total_returned / total_wagered × 100.
    pub rtp_pct: f64,
    /// Closed-form RTP of the same strategy.
    pub expected_rtp_pct: f64,
    /// Mean multiplier over won rounds.
    pub avg_cash_out_multiplier: Option<Decimal>,
}

impl RtpReport {
    pub fn win_rate(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.rounds_won as f64 / self.rounds as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

pub struct Backtester<'a> {
    engine: &'a RoundEngine,
}

impl<'a> Backtester<'a> {
    pub fn new(engine: &'a RoundEngine) -> Self {
        Self { engine }
    }

    /// The lane the strategy actually stops at.
    fn stop_lane(&self, strategy: &CashOutStrategy) -> u32 {
        let lanes = self.engine.params(strategy.difficulty).lanes;
        strategy.target_lane.clamp(1, lanes)
    }

    /// Exact RTP percent of a strategy: P(survive to lane N) × multiplier(N) × 100.
    pub fn expected_rtp(&self, strategy: &CashOutStrategy) -> f64 {
        let stop = self.stop_lane(strategy);
        let mut state = RoundState::idle(Decimal::ONE, strategy.difficulty);
        let mut survival = 1.0;

        for lane in 0..stop {
            state.position = lane;
            survival *= 1.0 - self.engine.bust_probability(&state);
            state.multiplier = self.engine.preview_next_multiplier(&state);
        }

        survival * state.multiplier.to_f64().unwrap_or(0.0) * 100.0
    }

    /// Play `rounds` rounds with the given strategy. Each stakes one unit,
    /// clamped into the engine's bet limits; RTP does not depend on stake.
    pub fn run<R: Rng + ?Sized>(
        &self,
        strategy: CashOutStrategy,
        rounds: u64,
        rng: &mut R,
    ) -> Result<RtpReport, GameError> {
        let stop = self.stop_lane(&strategy);
        let stake = self.engine.limits().clamp(Decimal::ONE);
        let mut rounds_won = 0u64;
        let mut total_returned = Decimal::ZERO;
        let mut multiplier_sum = Decimal::ZERO;

        for _ in 0..rounds {
            let mut state = self.engine.start(stake, strategy.difficulty)?;
            loop {
                if state.position >= stop {
                    let out = self.engine.cash_out(&state)?;
                    rounds_won += 1;
                    total_returned += out.payout;
                    multiplier_sum += out.multiplier;
                    break;
                }
                let step = self.engine.advance(&state, rng)?;
                match step.outcome {
                    Outcome::Advanced => state = step.state,
                    Outcome::Busted => break,
                    Outcome::CashedOut { payout, multiplier } => {
                        rounds_won += 1;
                        total_returned += payout;
                        multiplier_sum += multiplier;
                        break;
                    }
                }
            }
        }

        let total_wagered = stake * Decimal::from(rounds);
        let rtp_pct = if rounds > 0 {
            (total_returned / total_wagered * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };
        let avg_cash_out_multiplier = (rounds_won > 0)
            .then(|| (multiplier_sum / Decimal::from(rounds_won)).round_dp(2));

        let report = RtpReport {
            strategy,
            rounds,
            rounds_won,
            rounds_busted: rounds - rounds_won,
            total_wagered,
            total_returned,
            rtp_pct,
            expected_rtp_pct: self.expected_rtp(&strategy),
            avg_cash_out_multiplier,
        };

        debug!(
            difficulty = %strategy.difficulty,
            target_lane = stop,
            rounds,
            won = report.rounds_won,
            "Backtest complete"
        );
        Ok(report)
    }

    /// Run the same target lane across every difficulty.
    pub fn run_all<R: Rng + ?Sized>(
        &self,
        target_lane: u32,
        rounds: u64,
        rng: &mut R,
    ) -> Result<Vec<RtpReport>, GameError> {
        let mut reports = Vec::with_capacity(Difficulty::ALL.len());
        for difficulty in Difficulty::ALL {
            let report = self.run(CashOutStrategy { difficulty, target_lane }, rounds, rng)?;
            info!(
                difficulty = %difficulty,
                target_lane,
                rtp = format!("{:.2}%", report.rtp_pct),
                expected = format!("{:.2}%", report.expected_rtp_pct),
                win_rate = format!("{:.1}%", report.win_rate() * 100.0),
                "RTP backtest"
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
