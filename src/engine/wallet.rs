//! Wallet — player balance and transaction log.
//!
//! Round outcomes move money only through the `Ledger` trait, so the
//! session can be driven against any balance store.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{GameError, Transaction, TransactionKind};

/// Balance store consumed by the game session.
#[cfg_attr(test, mockall::automock)]
pub trait Ledger {
    /// Current balance.
    fn balance(&self) -> Decimal;

    /// Take a stake out of the balance. Returns the new balance.
    fn debit(&mut self, amount: Decimal) -> Result<Decimal, GameError>;

    /// Add funds (a deposit or winnings). Returns the new balance.
    fn credit(&mut self, amount: Decimal, kind: TransactionKind) -> Result<Decimal, GameError>;
}

/// In-memory wallet with an ordered transaction log (oldest first).
#[derive(Debug, Clone)]
pub struct Wallet {
    balance: Decimal,
    transactions: Vec<Transaction>,
}

impl Wallet {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            balance: starting_balance,
            transactions: Vec::new(),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Top up the balance.
    pub fn deposit(&mut self, amount: Decimal) -> Result<Decimal, GameError> {
        self.credit(amount, TransactionKind::Deposit)
    }

    fn push(&mut self, kind: TransactionKind, amount: Decimal) {
        self.transactions.push(Transaction {
            id: Uuid::new_v4(),
            kind,
            amount,
            balance_after: self.balance,
            created_at: Utc::now(),
        });
    }
}

fn require_positive(amount: Decimal) -> Result<(), GameError> {
    if amount <= Decimal::ZERO {
        return Err(GameError::InvalidAmount(format!("{amount} must be positive")));
    }
    Ok(())
}

impl Ledger for Wallet {
    fn balance(&self) -> Decimal {
        self.balance
    }

    fn debit(&mut self, amount: Decimal) -> Result<Decimal, GameError> {
        require_positive(amount)?;
        if amount > self.balance {
            warn!(needed = %amount, available = %self.balance, "Debit refused");
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.push(TransactionKind::Bet, -amount);
        debug!(amount = %amount, balance = %self.balance, "Wallet debited");
        Ok(self.balance)
    }

    fn credit(&mut self, amount: Decimal, kind: TransactionKind) -> Result<Decimal, GameError> {
        require_positive(amount)?;
        if kind == TransactionKind::Bet {
            return Err(GameError::InvalidAmount("bets are debits, not credits".into()));
        }
        self.balance += amount;
        self.push(kind, amount);
        debug!(amount = %amount, kind = %kind, balance = %self.balance, "Wallet credited");
        Ok(self.balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
