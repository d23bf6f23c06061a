//! Round engine — bet → multiplier trajectory → bust or cash-out.
//!
//! The engine is stateless apart from its configuration: each operation
//! takes a `RoundState` and returns a new one. Randomness is passed in
//! by the caller so outcomes can be made deterministic in tests.

use chrono::Utc;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::types::{
    round_multiplier, Difficulty, DifficultyParams, DifficultyTable, GameError, RoundState,
    RoundStatus,
};

/// Flat multiplier growth per lane, before the difficulty scalar.
const BASE_STEP: Decimal = dec!(0.2);
/// Extra growth per lane, weighted by how far across the road we are.
const POSITION_STEP: Decimal = dec!(0.3);
/// Stakes are whole cents.
pub const STAKE_DP: u32 = 2;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Who decides that a round busts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BustPolicy {
    /// Each advance busts with a position-scaled probability.
    Probabilistic {
        base_bust_rate: f64,
        risk_growth_factor: f64,
    },
    /// Advances never bust; an external collision detector reports busts.
    /// Collisions during the first `safe_moves` lanes are ignored.
    External { safe_moves: u32 },
}

impl Default for BustPolicy {
    fn default() -> Self {
        BustPolicy::Probabilistic {
            base_bust_rate: 0.05,
            risk_growth_factor: 2.0,
        }
    }
}

/// Inclusive stake limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetLimits {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for BetLimits {
    fn default() -> Self {
        Self { min: dec!(0.01), max: dec!(200) }
    }
}

impl BetLimits {
    pub fn check(&self, amount: Decimal) -> Result<(), GameError> {
        if amount <= Decimal::ZERO {
            return Err(GameError::InvalidBetAmount(format!("{amount} is not positive")));
        }
        if amount.normalize().scale() > STAKE_DP {
            return Err(GameError::InvalidBetAmount(format!("{amount} has sub-cent precision")));
        }
        if amount < self.min || amount > self.max {
            return Err(GameError::InvalidBetAmount(format!(
                "{amount} is outside {}..={}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Truncate an amount to whole cents, then clamp it into the limits.
    pub fn clamp(&self, amount: Decimal) -> Decimal {
        amount
            .round_dp_with_strategy(STAKE_DP, RoundingStrategy::ToZero)
            .max(self.min)
            .min(self.max)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What happened on a single advance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Advanced,
    Busted,
    /// The far side was reached and the round paid out automatically.
    CashedOut { payout: Decimal, multiplier: Decimal },
}

/// New state plus outcome of an advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub state: RoundState,
    pub outcome: Outcome,
}

/// New (idle) state plus the payout of a cash-out.
#[derive(Debug, Clone, PartialEq)]
pub struct CashOut {
    pub state: RoundState,
    pub payout: Decimal,
    /// Multiplier the payout was computed at.
    pub multiplier: Decimal,
}

/// Result of an externally reported collision.
#[derive(Debug, Clone, PartialEq)]
pub enum Collision {
    /// Inside the safe zone; the state is unchanged.
    Ignored(RoundState),
    Busted(RoundState),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RoundEngine {
    table: DifficultyTable,
    policy: BustPolicy,
    limits: BetLimits,
}

impl Default for RoundEngine {
    fn default() -> Self {
        Self::new(DifficultyTable::default(), BustPolicy::default(), BetLimits::default())
    }
}

impl RoundEngine {
    pub fn new(table: DifficultyTable, policy: BustPolicy, limits: BetLimits) -> Self {
        Self { table, policy, limits }
    }

    pub fn table(&self) -> &DifficultyTable {
        &self.table
    }

    pub fn policy(&self) -> BustPolicy {
        self.policy
    }

    pub fn limits(&self) -> BetLimits {
        self.limits
    }

    pub fn params(&self, difficulty: Difficulty) -> &DifficultyParams {
        self.table.get(difficulty)
    }

    /// Begin a round. Funds are the caller's concern.
    pub fn start(&self, bet_amount: Decimal, difficulty: Difficulty) -> Result<RoundState, GameError> {
        self.limits.check(bet_amount)?;

        let state = RoundState {
            status: RoundStatus::Playing,
            bet_amount,
            difficulty,
            position: 0,
            multiplier: Decimal::ONE,
            round_id: Some(Uuid::new_v4()),
            started_at: Some(Utc::now()),
        };

        debug!(
            round = ?state.round_id,
            bet = %bet_amount,
            difficulty = %difficulty,
            lanes = self.params(difficulty).lanes,
            "Round started"
        );
        Ok(state)
    }

    /// Probability that the next advance from `state` busts.
    ///
    /// p = base_rate × bust_scalar × (1 + ((position + 1) / lanes) × growth),
    /// clamped to [0, 1]. Always zero under the external policy.
    pub fn bust_probability(&self, state: &RoundState) -> f64 {
        match self.policy {
            BustPolicy::Probabilistic { base_bust_rate, risk_growth_factor } => {
                let params = self.params(state.difficulty);
                let progress = f64::from(state.position + 1) / f64::from(params.lanes);
                let p = base_bust_rate
                    * params.bust_chance_scalar
                    * (1.0 + progress * risk_growth_factor);
                p.clamp(0.0, 1.0)
            }
            BustPolicy::External { .. } => 0.0,
        }
    }

    /// Multiplier after stepping from `state` onto the next lane.
    pub fn preview_next_multiplier(&self, state: &RoundState) -> Decimal {
        let params = self.params(state.difficulty);
        next_multiplier(state.multiplier, state.position + 1, params)
    }

    /// Try to cross one more lane.
    pub fn advance<R: Rng + ?Sized>(&self, state: &RoundState, rng: &mut R) -> Result<Advance, GameError> {
        require_playing(state)?;

        let params = self.params(state.difficulty);
        let p = self.bust_probability(state);
        if p > 0.0 {
            let roll: f64 = rng.gen();
            if roll < p {
                let mut busted = state.clone();
                busted.status = RoundStatus::Busted;
                debug!(
                    round = ?state.round_id,
                    lane = state.position,
                    multiplier = %state.multiplier,
                    chance = p,
                    roll,
                    "Round busted"
                );
                return Ok(Advance { state: busted, outcome: Outcome::Busted });
            }
        }

        let position = state.position + 1;
        let multiplier = next_multiplier(state.multiplier, position, params);
        debug!(
            round = ?state.round_id,
            lane = position,
            lanes = params.lanes,
            multiplier = %multiplier,
            "Advanced"
        );

        if position >= params.lanes {
            let payout = state.bet_amount * multiplier;
            debug!(
                round = ?state.round_id,
                multiplier = %multiplier,
                payout = %payout,
                "Far side reached, cashing out"
            );
            return Ok(Advance {
                state: state.reset(),
                outcome: Outcome::CashedOut { payout, multiplier },
            });
        }

        let mut next = state.clone();
        next.position = position;
        next.multiplier = multiplier;
        Ok(Advance { state: next, outcome: Outcome::Advanced })
    }

    /// Take the winnings at the current multiplier.
    pub fn cash_out(&self, state: &RoundState) -> Result<CashOut, GameError> {
        require_playing(state)?;

        let payout = state.bet_amount * state.multiplier;
        debug!(
            round = ?state.round_id,
            lane = state.position,
            multiplier = %state.multiplier,
            payout = %payout,
            "Cashed out"
        );
        Ok(CashOut {
            state: state.reset(),
            payout,
            multiplier: state.multiplier,
        })
    }

    /// Handle a collision reported by an external detector.
    pub fn report_collision(&self, state: &RoundState) -> Result<Collision, GameError> {
        let safe_moves = match self.policy {
            BustPolicy::External { safe_moves } => safe_moves,
            BustPolicy::Probabilistic { .. } => return Err(GameError::ExternalBustDisabled),
        };
        require_playing(state)?;

        if state.position < safe_moves {
            debug!(round = ?state.round_id, lane = state.position, "Collision inside safe zone");
            return Ok(Collision::Ignored(state.clone()));
        }

        let mut busted = state.clone();
        busted.status = RoundStatus::Busted;
        debug!(
            round = ?state.round_id,
            lane = state.position,
            multiplier = %state.multiplier,
            "Round busted by collision"
        );
        Ok(Collision::Busted(busted))
    }
}

fn require_playing(state: &RoundState) -> Result<(), GameError> {
    if state.status != RoundStatus::Playing {
        return Err(GameError::InvalidState {
            expected: RoundStatus::Playing,
            actual: state.status,
        });
    }
    Ok(())
}

/// current + 0.2·s + (position / lanes)·0.3·s, rounded to two decimals.
fn next_multiplier(current: Decimal, position: u32, params: &DifficultyParams) -> Decimal {
    let scalar = params.multiplier_scalar;
    let base = BASE_STEP * scalar;
    let by_position = Decimal::from(position) * POSITION_STEP * scalar / Decimal::from(params.lanes);
    round_multiplier(current + base + by_position)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
