//! HTTP flows against the full router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use crossroad::config::AppConfig;
use crossroad::dashboard::{build_router, DashboardState};
use crossroad::engine::{GameHistory, GameSession, Wallet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const EXTERNAL: &str = r#"
[game]
starting_balance = 50.0
default_bet = 10.0

[engine.bust_policy]
kind = "external"
safe_moves = 0
"#;

fn router(doc: &str) -> Router {
    let cfg = AppConfig::from_toml(doc).unwrap();
    let session = GameSession::new(
        cfg.build_engine().unwrap(),
        Wallet::new(cfg.game.starting_balance),
        GameHistory::new(),
        cfg.game.default_bet,
        cfg.game.default_difficulty,
    );
    let state = DashboardState::new(
        session,
        StdRng::seed_from_u64(11),
        &cfg.game.name,
        &cfg.game.currency,
        cfg.game.rtp_target,
    );
    build_router(Arc::new(state))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn test_play_cross_and_collide() {
    let app = router(EXTERNAL);

    let (status, json) = call(&app, "POST", "/api/round/play", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["round"]["balance"].as_f64().unwrap(), 40.0);

    for _ in 0..3 {
        let (_, json) = call(&app, "POST", "/api/round/advance", None).await;
        assert_eq!(json["outcome"], "advanced");
    }

    let (_, json) = call(&app, "GET", "/api/round", None).await;
    assert_eq!(json["position"], 3);
    assert_eq!(json["multiplier"].as_f64().unwrap(), 1.72);
    assert_eq!(json["bust_chance"].as_f64().unwrap(), 0.0);

    let (_, json) = call(&app, "POST", "/api/round/collision", None).await;
    assert_eq!(json["outcome"], "busted");

    let (status, _) = call(&app, "POST", "/api/round/advance", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = call(&app, "POST", "/api/round/reset", None).await;
    assert_eq!(json["outcome"], "reset");
    assert_eq!(json["round"]["status"], "idle");

    let (_, json) = call(&app, "GET", "/api/history", None).await;
    assert_eq!(json[0]["status"], "busted");
    assert_eq!(json[0]["lanes_crossed"], 3);
}

#[tokio::test]
async fn test_bet_locked_while_playing() {
    let app = router(EXTERNAL);
    call(&app, "POST", "/api/round/play", None).await;

    let (status, json) = call(&app, "PUT", "/api/round/bet", Some(r#"{"difficulty": "Hard"}"#)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());

    let (status, _) = call(&app, "POST", "/api/round/bet/double", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_difficulty_is_bad_request() {
    let app = router(EXTERNAL);
    let (status, json) = call(&app, "PUT", "/api/round/bet", Some(r#"{"difficulty": "nightmare"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("nightmare"));
}

#[tokio::test]
async fn test_collision_conflicts_under_probabilistic_policy() {
    let app = router("");
    call(&app, "POST", "/api/round/play", None).await;
    let (status, _) = call(&app, "POST", "/api/round/collision", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_deposit_then_stats() {
    let app = router(EXTERNAL);
    let (status, json) = call(&app, "POST", "/api/wallet/deposit", Some(r#"{"amount": 0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = call(&app, "POST", "/api/wallet/deposit", Some(r#"{"amount": 25.5}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["balance"].as_f64().unwrap(), 75.5);

    let (_, json) = call(&app, "GET", "/api/history/stats", None).await;
    assert_eq!(json["rounds_played"], 0);

    let (status, json) = call(&app, "DELETE", "/api/history", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(json.is_null());
}
