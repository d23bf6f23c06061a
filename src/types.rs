//! Shared types for the CROSSROAD game.
//!
//! These types form the data model used across all modules: the
//! difficulty table, the round state value the engine transforms,
//! wallet transactions, history records, and the domain error enum.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Multipliers and payouts shown to the player carry two decimals.
pub const MULTIPLIER_DP: u32 = 2;

/// Round a multiplier to two decimals, half away from zero.
pub fn round_multiplier(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MULTIPLIER_DP, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty level chosen before a round starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Hardcore,
}

impl Difficulty {
    /// All difficulties in table order.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Hardcore,
    ];

    fn index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
            Difficulty::Hardcore => 3,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Hardcore => write!(f, "Hardcore"),
        }
    }
}

/// Parse a difficulty name (case-insensitive).
impl std::str::FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "hardcore" => Ok(Difficulty::Hardcore),
            _ => Err(GameError::InvalidDifficulty(s.to_string())),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = GameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Lane count and scalars for one difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyParams {
    /// Number of lanes to cross; reaching the last one cashes out.
    pub lanes: u32,
    /// Scales per-step multiplier growth.
    pub multiplier_scalar: Decimal,
    /// Scales per-step bust probability.
    pub bust_chance_scalar: f64,
}

impl DifficultyParams {
    /// Check the parameter ranges: lanes ≥ 1, multiplier scalar > 0,
    /// bust scalar ≥ 0.
    pub fn validate(&self, difficulty: Difficulty) -> Result<(), GameError> {
        if self.lanes == 0 {
            return Err(GameError::Config(format!("{difficulty}: lanes must be at least 1")));
        }
        if self.multiplier_scalar <= Decimal::ZERO {
            return Err(GameError::Config(format!(
                "{difficulty}: multiplier_scalar must be positive"
            )));
        }
        if !self.bust_chance_scalar.is_finite() || self.bust_chance_scalar < 0.0 {
            return Err(GameError::Config(format!(
                "{difficulty}: bust_chance_scalar must be a non-negative number"
            )));
        }
        Ok(())
    }
}

/// Static difficulty → parameters table.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyTable {
    entries: [DifficultyParams; 4],
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            entries: [
                DifficultyParams { lanes: 30, multiplier_scalar: dec!(1.1), bust_chance_scalar: 0.7 },
                DifficultyParams { lanes: 25, multiplier_scalar: dec!(1.5), bust_chance_scalar: 1.0 },
                DifficultyParams { lanes: 20, multiplier_scalar: dec!(2.0), bust_chance_scalar: 1.5 },
                DifficultyParams { lanes: 15, multiplier_scalar: dec!(3.0), bust_chance_scalar: 2.0 },
            ],
        }
    }
}

impl DifficultyTable {
    pub fn get(&self, difficulty: Difficulty) -> &DifficultyParams {
        &self.entries[difficulty.index()]
    }

    /// Replace one entry after validating it.
    pub fn set(&mut self, difficulty: Difficulty, params: DifficultyParams) -> Result<(), GameError> {
        params.validate(difficulty)?;
        self.entries[difficulty.index()] = params;
        Ok(())
    }

    /// Iterate entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Difficulty, &DifficultyParams)> {
        Difficulty::ALL.iter().map(move |d| (*d, self.get(*d)))
    }
}

// ---------------------------------------------------------------------------
// Round state
// ---------------------------------------------------------------------------

/// Round lifecycle status. A cash-out returns the round to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Idle,
    Playing,
    Busted,
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundStatus::Idle => write!(f, "idle"),
            RoundStatus::Playing => write!(f, "playing"),
            RoundStatus::Busted => write!(f, "busted"),
        }
    }
}

/// One in-progress or concluded round.
///
/// The engine treats this as a value: every operation returns a new
/// state rather than mutating the caller's copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub status: RoundStatus,
    pub bet_amount: Decimal,
    pub difficulty: Difficulty,
    /// Lanes crossed so far (0 ≤ position ≤ lanes).
    pub position: u32,
    /// Current payout multiplier (≥ 1.00).
    pub multiplier: Decimal,
    pub round_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} bet={:.2} lane={} mult={:.2}x",
            self.status, self.difficulty, self.bet_amount, self.position, self.multiplier,
        )
    }
}

impl RoundState {
    /// An idle round carrying the given bet and difficulty as defaults.
    pub fn idle(bet_amount: Decimal, difficulty: Difficulty) -> Self {
        Self {
            status: RoundStatus::Idle,
            bet_amount,
            difficulty,
            position: 0,
            multiplier: Decimal::ONE,
            round_id: None,
            started_at: None,
        }
    }

    /// Back to idle, keeping bet and difficulty.
    pub fn reset(&self) -> Self {
        Self::idle(self.bet_amount, self.difficulty)
    }

    pub fn is_playing(&self) -> bool {
        self.status == RoundStatus::Playing
    }

    /// What a cash-out would pay right now.
    pub fn potential_payout(&self) -> Decimal {
        self.bet_amount * self.multiplier
    }
}

// ---------------------------------------------------------------------------
// Wallet transactions
// ---------------------------------------------------------------------------

/// Transaction tag in the wallet log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Bet,
    Win,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Bet => write!(f, "bet"),
            TransactionKind::Win => write!(f, "win"),
        }
    }
}

/// A single wallet movement. Bets carry a negative amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount >= Decimal::ZERO { "+" } else { "-" };
        write!(
            f,
            "{} {sign}{:.2} (balance {:.2})",
            self.kind,
            self.amount.abs(),
            self.balance_after,
        )
    }
}

// ---------------------------------------------------------------------------
// Round history
// ---------------------------------------------------------------------------

/// How a concluded round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Won,
    Busted,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Won => write!(f, "won"),
            RecordStatus::Busted => write!(f, "busted"),
        }
    }
}

/// A concluded round as written to the history sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: Uuid,
    pub bet_amount: Decimal,
    pub difficulty: Difficulty,
    /// Multiplier at the moment the round ended.
    pub final_multiplier: Decimal,
    /// Set only for won rounds.
    pub cashed_out_at: Option<Decimal>,
    pub winnings: Decimal,
    pub status: RecordStatus,
    pub lanes_crossed: u32,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} bet={:.2} at {:.2}x after {} lanes, winnings={:.2}",
            self.status,
            self.difficulty,
            self.bet_amount,
            self.final_multiplier,
            self.lanes_crossed,
            self.winnings,
        )
    }
}

impl RoundRecord {
    /// Record for a round that was cashed out at `multiplier`.
    pub fn won(state: &RoundState, multiplier: Decimal, position: u32, payout: Decimal) -> Self {
        Self {
            id: state.round_id.unwrap_or_else(Uuid::new_v4),
            bet_amount: state.bet_amount,
            difficulty: state.difficulty,
            final_multiplier: multiplier,
            cashed_out_at: Some(multiplier),
            winnings: payout,
            status: RecordStatus::Won,
            lanes_crossed: position,
            created_at: Utc::now(),
        }
    }

    /// Record for a busted round; the bet is forfeited.
    pub fn busted(state: &RoundState) -> Self {
        Self {
            id: state.round_id.unwrap_or_else(Uuid::new_v4),
            bet_amount: state.bet_amount,
            difficulty: state.difficulty,
            final_multiplier: state.multiplier,
            cashed_out_at: None,
            winnings: Decimal::ZERO,
            status: RecordStatus::Busted,
            lanes_crossed: state.position,
            created_at: Utc::now(),
        }
    }

    /// Winnings minus the stake.
    pub fn profit(&self) -> Decimal {
        self.winnings - self.bet_amount
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors. All are synchronous validation failures; none leave
/// partial state behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Invalid round state: expected {expected}, found {actual}")]
    InvalidState { expected: RoundStatus, actual: RoundStatus },

    #[error("Unknown difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid bet amount: {0}")]
    InvalidBetAmount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Collisions are not reported under the probabilistic bust policy")]
    ExternalBustDisabled,

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
