//! Dashboard API route handlers.
//!
//! All endpoints return JSON. The single game session is shared via
//! `Arc<DashboardState>`; domain errors map to 4xx responses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::engine::{BustPolicy, GameHistory, GameSession, HistoryStats, Ledger, Turn, TurnOutcome, Wallet};
use crate::types::{Difficulty, GameError, RoundRecord, RoundState, Transaction};

/// How many wallet/history entries list endpoints return.
const LIST_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub type Session = GameSession<Wallet, GameHistory>;

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub session: RwLock<Session>,
    pub rng: Mutex<StdRng>,
    pub name: String,
    pub currency: String,
    pub rtp_target: f64,
}

impl DashboardState {
    pub fn new(session: Session, rng: StdRng, name: &str, currency: &str, rtp_target: f64) -> Self {
        Self {
            session: RwLock::new(session),
            rng: Mutex::new(rng),
            name: name.to_string(),
            currency: currency.to_string(),
            rtp_target,
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON error wrapper for domain failures.
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GameError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            GameError::InvalidState { .. } | GameError::ExternalBustDisabled => StatusCode::CONFLICT,
            GameError::InvalidDifficulty(_)
            | GameError::InvalidBetAmount(_)
            | GameError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            GameError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = status.as_u16(), error = %self.0, "Request rejected");
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DifficultyEntry {
    pub difficulty: Difficulty,
    pub lanes: u32,
    pub multiplier_scalar: Decimal,
    pub bust_chance_scalar: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub name: String,
    pub currency: String,
    pub rtp_target: f64,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    pub bust_policy: BustPolicy,
    pub difficulties: Vec<DifficultyEntry>,
}

/// The current round plus derived figures for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    #[serde(flatten)]
    pub round: RoundState,
    pub lanes: u32,
    pub next_multiplier: Decimal,
    pub bust_chance: f64,
    pub potential_payout: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    #[serde(flatten)]
    pub outcome: TurnOutcome,
    pub round: RoundView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BetRequest {
    pub bet_amount: Option<Decimal>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletResponse {
    pub balance: Decimal,
    pub currency: String,
    /// Newest first.
    pub transactions: Vec<Transaction>,
}

fn round_view(session: &Session) -> RoundView {
    let round = session.round().clone();
    let engine = session.engine();
    RoundView {
        lanes: engine.params(round.difficulty).lanes,
        next_multiplier: engine.preview_next_multiplier(&round),
        bust_chance: if round.is_playing() { engine.bust_probability(&round) } else { 0.0 },
        potential_payout: round.potential_payout(),
        balance: session.balance(),
        round,
    }
}

fn turn_response(session: &Session, turn: Turn) -> TurnResponse {
    TurnResponse { outcome: turn.outcome, round: round_view(session) }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let session = state.session.read().await;
    let engine = session.engine();
    let limits = engine.limits();
    Json(ConfigResponse {
        name: state.name.clone(),
        currency: state.currency.clone(),
        rtp_target: state.rtp_target,
        min_bet: limits.min,
        max_bet: limits.max,
        bust_policy: engine.policy(),
        difficulties: engine
            .table()
            .iter()
            .map(|(difficulty, p)| DifficultyEntry {
                difficulty,
                lanes: p.lanes,
                multiplier_scalar: p.multiplier_scalar,
                bust_chance_scalar: p.bust_chance_scalar,
            })
            .collect(),
    })
}

/// GET /api/round
pub async fn get_round(State(state): State<AppState>) -> Json<RoundView> {
    let session = state.session.read().await;
    Json(round_view(&session))
}

/// PUT /api/round/bet
pub async fn put_bet(State(state): State<AppState>, Json(req): Json<BetRequest>) -> ApiResult<RoundView> {
    // Parse first so a bad name leaves the bet untouched.
    let difficulty = req.difficulty.as_deref().map(str::parse::<Difficulty>).transpose()?;

    let mut session = state.session.write().await;
    if let Some(amount) = req.bet_amount {
        session.set_bet_amount(amount)?;
    }
    if let Some(difficulty) = difficulty {
        session.set_difficulty(difficulty)?;
    }
    Ok(Json(round_view(&session)))
}

/// POST /api/round/bet/:action (`half`, `double`, `max`).
pub async fn adjust_bet(State(state): State<AppState>, Path(action): Path<String>) -> ApiResult<RoundView> {
    let mut session = state.session.write().await;
    match action.as_str() {
        "half" => session.halve_bet()?,
        "double" => session.double_bet()?,
        "max" => session.max_bet()?,
        other => return Err(GameError::InvalidBetAmount(format!("unknown bet action '{other}'")).into()),
    };
    Ok(Json(round_view(&session)))
}

/// POST /api/round/play
pub async fn play(State(state): State<AppState>) -> ApiResult<TurnResponse> {
    let mut session = state.session.write().await;
    let turn = session.play()?;
    Ok(Json(turn_response(&session, turn)))
}

/// POST /api/round/advance
pub async fn advance(State(state): State<AppState>) -> ApiResult<TurnResponse> {
    let mut session = state.session.write().await;
    let mut rng = state.rng.lock().await;
    let turn = session.advance(&mut *rng)?;
    Ok(Json(turn_response(&session, turn)))
}

/// POST /api/round/cash-out
pub async fn cash_out(State(state): State<AppState>) -> ApiResult<TurnResponse> {
    let mut session = state.session.write().await;
    let turn = session.cash_out()?;
    Ok(Json(turn_response(&session, turn)))
}

/// POST /api/round/collision
pub async fn collision(State(state): State<AppState>) -> ApiResult<TurnResponse> {
    let mut session = state.session.write().await;
    let turn = session.report_collision()?;
    Ok(Json(turn_response(&session, turn)))
}

/// POST /api/round/reset
pub async fn reset(State(state): State<AppState>) -> ApiResult<TurnResponse> {
    let mut session = state.session.write().await;
    let turn = session.reset()?;
    Ok(Json(turn_response(&session, turn)))
}

/// GET /api/wallet
pub async fn get_wallet(State(state): State<AppState>) -> Json<WalletResponse> {
    let session = state.session.read().await;
    let wallet = session.ledger();
    Json(WalletResponse {
        balance: wallet.balance(),
        currency: state.currency.clone(),
        transactions: wallet.transactions().iter().rev().take(LIST_LIMIT).cloned().collect(),
    })
}

/// POST /api/wallet/deposit
pub async fn deposit(State(state): State<AppState>, Json(req): Json<DepositRequest>) -> ApiResult<WalletResponse> {
    let mut session = state.session.write().await;
    session.ledger_mut().deposit(req.amount)?;
    let wallet = session.ledger();
    Ok(Json(WalletResponse {
        balance: wallet.balance(),
        currency: state.currency.clone(),
        transactions: wallet.transactions().iter().rev().take(LIST_LIMIT).cloned().collect(),
    }))
}

/// GET /api/history
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<RoundRecord>> {
    let session = state.session.read().await;
    Json(session.history().rounds().iter().take(LIST_LIMIT).cloned().collect())
}

/// DELETE /api/history
pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    let mut session = state.session.write().await;
    session.history_mut().clear();
    StatusCode::NO_CONTENT
}

/// GET /api/history/stats
pub async fn get_history_stats(State(state): State<AppState>) -> Json<HistoryStats> {
    let session = state.session.read().await;
    Json(session.history().stats())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
