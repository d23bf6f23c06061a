//! CROSSROAD — lane-crossing wagering game
//!
//! Entry point. Loads configuration, initialises structured logging,
//! runs a start-up RTP backtest per difficulty, and serves the game
//! dashboard until Ctrl+C.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{info, warn};

use crossroad::backtest::runner::{Backtester, RtpReport};
use crossroad::config::AppConfig;
use crossroad::dashboard::{self, DashboardState};
use crossroad::engine::{GameHistory, GameSession, Wallet};

const BANNER: &str = r#"
  ____ ____   ___  ____ ____  ____   ___    _    ____
 / ___|  _ \ / _ \/ ___/ ___||  _ \ / _ \  / \  |  _ \
| |   | |_) | | | \___ \___ \| |_) | | | |/ _ \ | | | |
| |___|  _ <| |_| |___) |__) |  _ <| |_| / ___ \| |_| |
 \____|_| \_\\___/|____/____/|_| \_\\___/_/   \_\____/

  Cross the lanes. Cash out before you bust.
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = AppConfig::load_or_default("config.toml")?;

    println!("{BANNER}");
    info!(
        name = %cfg.game.name,
        currency = %cfg.game.currency,
        starting_balance = %cfg.game.starting_balance,
        rtp_target = cfg.game.rtp_target,
        bust_policy = ?cfg.engine.bust_policy,
        "CROSSROAD starting up"
    );

    let engine = cfg.build_engine()?;

    // -- Start-up RTP check ------------------------------------------------

    if cfg.simulation.rounds > 0 {
        let mut rng = StdRng::from_entropy();
        let reports = Backtester::new(&engine)
            .run_all(cfg.simulation.target_lane, cfg.simulation.rounds, &mut rng)
            .context("RTP backtest failed")?;
        check_rtp(&reports, cfg.game.rtp_target, cfg.simulation.rtp_tolerance_pct);
    }

    if !cfg.dashboard.enabled {
        info!("Dashboard disabled, nothing left to do");
        return Ok(());
    }

    // -- Session & dashboard -----------------------------------------------

    let session = GameSession::new(
        engine,
        Wallet::new(cfg.game.starting_balance),
        GameHistory::new(),
        cfg.game.default_bet,
        cfg.game.default_difficulty,
    );
    let state = Arc::new(DashboardState::new(
        session,
        StdRng::from_entropy(),
        &cfg.game.name,
        &cfg.game.currency,
        cfg.game.rtp_target,
    ));

    info!("Press Ctrl+C to stop.");
    dashboard::serve(state, cfg.dashboard.port, shutdown_signal()).await?;

    info!("CROSSROAD stopped");
    Ok(())
}

/// Warn about difficulties whose simulated RTP strays from the target.
fn check_rtp(reports: &[RtpReport], target: f64, tolerance: f64) {
    for report in reports {
        let drift = report.rtp_pct - target;
        if drift.abs() > tolerance {
            warn!(
                difficulty = %report.strategy.difficulty,
                target_lane = report.strategy.target_lane,
                rtp = format!("{:.2}%", report.rtp_pct),
                target = format!("{target:.2}%"),
                drift = format!("{drift:+.2}"),
                "Simulated RTP outside tolerance"
            );
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crossroad=info"));

    let json_logging = std::env::var("CROSSROAD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
