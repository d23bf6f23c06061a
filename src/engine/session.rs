//! Game session — one player's table.
//!
//! Wraps the round engine with the money and bookkeeping that happen
//! around it: funds are checked and the stake debited before a round
//! starts, winnings are credited on cash-out, and every concluded round
//! is written to the history sink. Wallet and history are injected.

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};

use super::history::HistorySink;
use super::round::{Collision, Outcome, RoundEngine};
use super::wallet::Ledger;
use crate::types::{Difficulty, GameError, RoundRecord, RoundState, RoundStatus, TransactionKind};

/// What a session action produced, for the caller to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub state: RoundState,
    pub outcome: TurnOutcome,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    Started,
    Advanced,
    /// A collision landed inside the safe zone.
    Dodged,
    Busted,
    CashedOut { payout: Decimal, multiplier: Decimal },
    Reset,
}

pub struct GameSession<L: Ledger, H: HistorySink> {
    engine: RoundEngine,
    round: RoundState,
    ledger: L,
    history: H,
}

impl<L: Ledger, H: HistorySink> GameSession<L, H> {
    /// A session with an idle round using the given defaults.
    pub fn new(
        engine: RoundEngine,
        ledger: L,
        history: H,
        default_bet: Decimal,
        default_difficulty: Difficulty,
    ) -> Self {
        Self {
            engine,
            round: RoundState::idle(default_bet, default_difficulty),
            ledger,
            history,
        }
    }

    pub fn engine(&self) -> &RoundEngine {
        &self.engine
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn balance(&self) -> Decimal {
        self.ledger.balance()
    }

    // -- Bet selection (only between rounds) --------------------------------

    pub fn set_bet_amount(&mut self, amount: Decimal) -> Result<&RoundState, GameError> {
        self.require_not_playing()?;
        self.engine.limits().check(amount)?;
        self.round.bet_amount = amount;
        Ok(&self.round)
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<&RoundState, GameError> {
        self.require_not_playing()?;
        self.round.difficulty = difficulty;
        Ok(&self.round)
    }

    /// Halve the stake, not going below the table minimum.
    pub fn halve_bet(&mut self) -> Result<&RoundState, GameError> {
        self.require_not_playing()?;
        self.round.bet_amount = self.engine.limits().clamp(self.round.bet_amount / dec!(2));
        Ok(&self.round)
    }

    /// Double the stake, not going above the table maximum.
    pub fn double_bet(&mut self) -> Result<&RoundState, GameError> {
        self.require_not_playing()?;
        self.round.bet_amount = self.engine.limits().clamp(self.round.bet_amount * dec!(2));
        Ok(&self.round)
    }

    /// Stake the whole balance (capped at the table maximum).
    pub fn max_bet(&mut self) -> Result<&RoundState, GameError> {
        self.require_not_playing()?;
        let limits = self.engine.limits();
        let balance = self.ledger.balance();
        if balance < limits.min {
            return Err(GameError::InsufficientFunds { needed: limits.min, available: balance });
        }
        self.round.bet_amount = limits.clamp(balance);
        Ok(&self.round)
    }

    // -- Round lifecycle ----------------------------------------------------

    /// Place the current bet and start a round.
    pub fn play(&mut self) -> Result<Turn, GameError> {
        self.require_not_playing()?;

        let bet = self.round.bet_amount;
        let available = self.ledger.balance();
        if available < bet {
            warn!(bet = %bet, balance = %available, "Insufficient funds to play");
            return Err(GameError::InsufficientFunds { needed: bet, available });
        }

        let started = self.engine.start(bet, self.round.difficulty)?;
        let balance = self.ledger.debit(bet)?;
        info!(
            round = ?started.round_id,
            bet = %bet,
            difficulty = %started.difficulty,
            balance = %balance,
            "Round started"
        );
        self.round = started;
        Ok(self.turn(TurnOutcome::Started, balance))
    }

    /// Cross one lane.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Turn, GameError> {
        let before = self.round.clone();
        let step = self.engine.advance(&before, rng)?;

        let outcome = match step.outcome {
            Outcome::Advanced => TurnOutcome::Advanced,
            Outcome::Busted => {
                info!(
                    round = ?step.state.round_id,
                    lane = step.state.position,
                    multiplier = %step.state.multiplier,
                    "Round busted"
                );
                self.history.record(RoundRecord::busted(&step.state));
                TurnOutcome::Busted
            }
            Outcome::CashedOut { payout, multiplier } => {
                let lanes = self.engine.params(before.difficulty).lanes;
                self.settle_win(&before, multiplier, lanes, payout)?;
                TurnOutcome::CashedOut { payout, multiplier }
            }
        };

        self.round = step.state;
        let balance = self.ledger.balance();
        Ok(self.turn(outcome, balance))
    }

    /// Take the winnings now.
    pub fn cash_out(&mut self) -> Result<Turn, GameError> {
        let before = self.round.clone();
        let out = self.engine.cash_out(&before)?;
        self.settle_win(&before, out.multiplier, before.position, out.payout)?;

        self.round = out.state;
        let balance = self.ledger.balance();
        Ok(self.turn(
            TurnOutcome::CashedOut { payout: out.payout, multiplier: out.multiplier },
            balance,
        ))
    }

    /// Forward a collision from an external detector.
    pub fn report_collision(&mut self) -> Result<Turn, GameError> {
        let outcome = match self.engine.report_collision(&self.round)? {
            Collision::Ignored(_) => TurnOutcome::Dodged,
            Collision::Busted(state) => {
                self.history.record(RoundRecord::busted(&state));
                self.round = state;
                TurnOutcome::Busted
            }
        };
        let balance = self.ledger.balance();
        Ok(self.turn(outcome, balance))
    }

    /// Clear a busted round back to idle, keeping bet and difficulty.
    pub fn reset(&mut self) -> Result<Turn, GameError> {
        self.require_not_playing()?;
        self.round = self.round.reset();
        let balance = self.ledger.balance();
        Ok(self.turn(TurnOutcome::Reset, balance))
    }

    // -- Helpers ------------------------------------------------------------

    fn settle_win(
        &mut self,
        round: &RoundState,
        multiplier: Decimal,
        lanes_crossed: u32,
        payout: Decimal,
    ) -> Result<(), GameError> {
        let balance = self.ledger.credit(payout, TransactionKind::Win)?;
        let record = RoundRecord::won(round, multiplier, lanes_crossed, payout);
        info!(
            round = %record.id,
            multiplier = %multiplier,
            payout = %payout,
            balance = %balance,
            "Winnings credited"
        );
        self.history.record(record);
        Ok(())
    }

    fn require_not_playing(&self) -> Result<(), GameError> {
        if self.round.status == RoundStatus::Playing {
            warn!(round = ?self.round.round_id, "Action refused while a round is in play");
            return Err(GameError::InvalidState {
                expected: RoundStatus::Idle,
                actual: RoundStatus::Playing,
            });
        }
        Ok(())
    }

    fn turn(&self, outcome: TurnOutcome, balance: Decimal) -> Turn {
        Turn { state: self.round.clone(), outcome, balance }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
