//! Round history — ledger sink for concluded rounds plus aggregates.

use rust_decimal::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

use crate::types::{RecordStatus, RoundRecord};

/// Destination for concluded rounds.
#[cfg_attr(test, mockall::automock)]
pub trait HistorySink {
    fn record(&mut self, round: RoundRecord);
}

/// Aggregate figures over the recorded rounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub rounds_played: usize,
    pub rounds_won: usize,
    pub rounds_busted: usize,
    pub total_wagered: Decimal,
    pub total_won: Decimal,
    pub net_profit: Decimal,
    /// Returned / wagered × 100; zero when nothing was wagered.
    pub observed_rtp_pct: f64,
    pub best_multiplier: Option<Decimal>,
}

/// In-memory history, newest round first.
#[derive(Debug, Clone, Default)]
pub struct GameHistory {
    rounds: VecDeque<RoundRecord>,
}

impl GameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded rounds, newest first.
    pub fn rounds(&self) -> &VecDeque<RoundRecord> {
        &self.rounds
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }

    pub fn stats(&self) -> HistoryStats {
        let mut total_wagered = Decimal::ZERO;
        let mut total_won = Decimal::ZERO;
        let mut rounds_won = 0;
        let mut best: Option<Decimal> = None;

        for round in &self.rounds {
            total_wagered += round.bet_amount;
            total_won += round.winnings;
            if round.status == RecordStatus::Won {
                rounds_won += 1;
                if let Some(at) = round.cashed_out_at {
                    best = Some(best.map_or(at, |b| b.max(at)));
                }
            }
        }

        let observed_rtp_pct = if total_wagered > Decimal::ZERO {
            (total_won / total_wagered * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        HistoryStats {
            rounds_played: self.rounds.len(),
            rounds_won,
            rounds_busted: self.rounds.len() - rounds_won,
            total_wagered,
            total_won,
            net_profit: total_won - total_wagered,
            observed_rtp_pct,
            best_multiplier: best,
        }
    }
}

impl HistorySink for GameHistory {
    fn record(&mut self, round: RoundRecord) {
        debug!(round = %round.id, status = %round.status, winnings = %round.winnings, "Round recorded");
        self.rounds.push_front(round);
    }
}
