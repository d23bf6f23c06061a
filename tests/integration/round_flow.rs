//! Whole-round flows through a session built from configuration.

use crossroad::backtest::runner::{Backtester, CashOutStrategy};
use crossroad::config::AppConfig;
use crossroad::engine::{GameHistory, GameSession, Ledger, TurnOutcome, Wallet};
use crossroad::types::{Difficulty, GameError, RecordStatus, RoundStatus, TransactionKind};
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn never_bust() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

fn always_bust() -> StepRng {
    StepRng::new(0, 0)
}

fn session_from(doc: &str) -> GameSession<Wallet, GameHistory> {
    let cfg = AppConfig::from_toml(doc).unwrap();
    GameSession::new(
        cfg.build_engine().unwrap(),
        Wallet::new(cfg.game.starting_balance),
        GameHistory::new(),
        cfg.game.default_bet,
        cfg.game.default_difficulty,
    )
}

#[test]
fn test_session_from_default_config() {
    let mut s = session_from("");
    assert_eq!(s.balance(), dec!(1000));
    assert_eq!(s.round().bet_amount, dec!(1));

    s.set_bet_amount(dec!(20)).unwrap();
    s.play().unwrap();
    let mut rng = never_bust();
    s.advance(&mut rng).unwrap();
    s.advance(&mut rng).unwrap();
    let turn = s.advance(&mut rng).unwrap();
    assert_eq!(turn.state.multiplier, dec!(1.72));

    let out = s.cash_out().unwrap();
    assert_eq!(out.outcome, TurnOutcome::CashedOut { payout: dec!(34.40), multiplier: dec!(1.72) });
    assert_eq!(s.balance(), dec!(1014.40));
}

#[test]
fn test_ledger_records_every_movement() {
    let mut s = session_from("");
    s.ledger_mut().deposit(dec!(50)).unwrap();
    s.play().unwrap();
    s.advance(&mut never_bust()).unwrap();
    s.cash_out().unwrap();
    s.play().unwrap();
    s.advance(&mut always_bust()).unwrap();

    let kinds: Vec<_> = s.ledger().transactions().iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TransactionKind::Deposit, TransactionKind::Bet, TransactionKind::Win, TransactionKind::Bet]
    );
    let last = s.ledger().transactions().last().unwrap();
    assert_eq!(last.balance_after, s.ledger().balance());
}

#[test]
fn test_history_is_newest_first() {
    let mut s = session_from("");
    s.play().unwrap();
    s.advance(&mut always_bust()).unwrap();
    s.reset().unwrap();
    s.play().unwrap();
    s.advance(&mut never_bust()).unwrap();
    s.cash_out().unwrap();

    let rounds = s.history().rounds();
    assert_eq!(rounds.len(), 2);
    assert_eq!(rounds[0].status, RecordStatus::Won);
    assert_eq!(rounds[1].status, RecordStatus::Busted);

    let stats = s.history().stats();
    assert_eq!(stats.rounds_played, 2);
    assert_eq!(stats.total_wagered, dec!(2));
    assert_eq!(stats.total_won, dec!(1.23));
}

#[test]
fn test_wallet_never_goes_negative() {
    let mut s = session_from("[game]\nstarting_balance = 3.0\ndefault_bet = 2.0");
    s.play().unwrap();
    s.advance(&mut always_bust()).unwrap();
    let err = s.play().unwrap_err();
    assert_eq!(err, GameError::InsufficientFunds { needed: dec!(2), available: dec!(1) });
    assert_eq!(s.balance(), dec!(1));
    assert!(s.balance() >= Decimal::ZERO);
}

#[test]
fn test_external_policy_grace_period() {
    let doc = "[engine.bust_policy]\nkind = \"external\"\nsafe_moves = 5";
    let mut s = session_from(doc);
    s.play().unwrap();
    let mut rng = always_bust();
    for _ in 0..4 {
        // The rng would bust any probabilistic roll
        assert_eq!(s.advance(&mut rng).unwrap().outcome, TurnOutcome::Advanced);
        assert_eq!(s.report_collision().unwrap().outcome, TurnOutcome::Dodged);
    }
    s.advance(&mut rng).unwrap();
    let turn = s.report_collision().unwrap();
    assert_eq!(turn.outcome, TurnOutcome::Busted);
    assert_eq!(turn.state.status, RoundStatus::Busted);
    assert_eq!(turn.state.position, 5);
}

#[test]
fn test_hardcore_far_side_auto_cash_out() {
    let mut s = session_from("[game]\ndefault_difficulty = \"Hardcore\"\ndefault_bet = 10.0");
    s.play().unwrap();
    let mut rng = never_bust();
    let mut outcome = TurnOutcome::Started;
    while s.round().is_playing() {
        outcome = s.advance(&mut rng).unwrap().outcome;
    }
    let TurnOutcome::CashedOut { payout, multiplier } = outcome else {
        panic!("expected automatic cash-out, got {outcome:?}");
    };
    assert_eq!(payout, dec!(10) * multiplier);
    assert_eq!(s.history().rounds()[0].lanes_crossed, 15);
    assert_eq!(s.round().difficulty, Difficulty::Hardcore);
}

#[test]
fn test_backtest_matches_closed_form() {
    let cfg = AppConfig::from_toml("").unwrap();
    let engine = cfg.build_engine().unwrap();
    let bt = Backtester::new(&engine);
    let mut rng = StdRng::seed_from_u64(77);
    let report = bt
        .run(CashOutStrategy { difficulty: Difficulty::Hard, target_lane: 3 }, 20_000, &mut rng)
        .unwrap();
    assert!((report.rtp_pct - report.expected_rtp_pct).abs() < 4.0);
    assert!(report.rounds_busted > 0);
}
