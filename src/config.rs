//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults matching the stock game, so a missing
//! file or a partial one still yields a playable configuration.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::engine::round::{BetLimits, BustPolicy, RoundEngine};
use crate::types::{Difficulty, DifficultyParams, DifficultyTable};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub engine: EngineConfig,
    /// Per-difficulty overrides keyed by difficulty name.
    pub difficulties: HashMap<String, DifficultyParams>,
    pub simulation: SimulationConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    pub name: String,
    /// Currency label shown next to amounts.
    pub currency: String,
    pub starting_balance: Decimal,
    pub default_bet: Decimal,
    pub default_difficulty: Difficulty,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    /// Target return to player, in percent.
    pub rtp_target: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: "CROSSROAD".to_string(),
            currency: "R".to_string(),
            starting_balance: dec!(1000),
            default_bet: dec!(1),
            default_difficulty: Difficulty::Easy,
            min_bet: dec!(0.01),
            max_bet: dec!(200),
            rtp_target: 95.5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub bust_policy: BustPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    /// Rounds per difficulty in the start-up RTP backtest (0 disables it).
    pub rounds: u64,
    pub target_lane: u32,
    /// Warn when the estimate strays further than this from the target.
    pub rtp_tolerance_pct: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 10_000,
            target_lane: 5,
            rtp_tolerance_pct: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: true, port: 3000 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let game = &self.game;
        if !(1.0..=100.0).contains(&game.rtp_target) {
            bail!("rtp_target must be between 1 and 100, got {}", game.rtp_target);
        }
        if game.min_bet <= Decimal::ZERO || game.min_bet > game.max_bet {
            bail!("bet limits must satisfy 0 < min_bet <= max_bet");
        }
        if game.starting_balance < Decimal::ZERO {
            bail!("starting_balance cannot be negative");
        }
        self.bet_limits().check(game.default_bet).context("default_bet")?;

        if let BustPolicy::Probabilistic { base_bust_rate, risk_growth_factor } =
            self.engine.bust_policy
        {
            if !(0.0..=1.0).contains(&base_bust_rate) {
                bail!("base_bust_rate must be within [0, 1], got {base_bust_rate}");
            }
            if !risk_growth_factor.is_finite() || risk_growth_factor < 0.0 {
                bail!("risk_growth_factor must be non-negative, got {risk_growth_factor}");
            }
        }

        self.difficulty_table()?;
        Ok(())
    }

    /// Default table with the configured overrides applied.
    pub fn difficulty_table(&self) -> Result<DifficultyTable> {
        let mut table = DifficultyTable::default();
        for (name, params) in &self.difficulties {
            let difficulty: Difficulty = name.parse()?;
            table.set(difficulty, *params)?;
        }
        Ok(table)
    }

    pub fn bet_limits(&self) -> BetLimits {
        BetLimits { min: self.game.min_bet, max: self.game.max_bet }
    }

    /// Round engine built from this configuration.
    pub fn build_engine(&self) -> Result<RoundEngine> {
        Ok(RoundEngine::new(
            self.difficulty_table()?,
            self.engine.bust_policy,
            self.bet_limits(),
        ))
    }
}
