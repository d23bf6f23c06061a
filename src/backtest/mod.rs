//! Return-to-player backtesting of cash-out strategies.

pub mod runner;
