//! Core engine — round resolution plus the wallet, history and session
//! that surround it.

pub mod round;
pub mod wallet;
pub mod history;
pub mod session;

pub use history::{GameHistory, HistorySink, HistoryStats};
pub use round::{Advance, BetLimits, BustPolicy, CashOut, Collision, Outcome, RoundEngine};
pub use session::{GameSession, Turn, TurnOutcome};
pub use wallet::{Ledger, Wallet};
