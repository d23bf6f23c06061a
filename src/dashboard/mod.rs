//! Dashboard — Axum web server for playing the game.
//!
//! Serves a REST API over a single shared session and a self-contained
//! HTML page that drives it. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::{get, post, put},
    Router,
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub use routes::{AppState, DashboardState};

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Serve the dashboard until `shutdown` resolves.
pub async fn serve<F>(state: AppState, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Dashboard server error")?;

    info!("Dashboard server stopped");
    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Round
        .route("/api/config", get(routes::get_config))
        .route("/api/round", get(routes::get_round))
        .route("/api/round/bet", put(routes::put_bet))
        .route("/api/round/bet/:action", post(routes::adjust_bet))
        .route("/api/round/play", post(routes::play))
        .route("/api/round/advance", post(routes::advance))
        .route("/api/round/cash-out", post(routes::cash_out))
        .route("/api/round/collision", post(routes::collision))
        .route("/api/round/reset", post(routes::reset))
        // Wallet & history
        .route("/api/wallet", get(routes::get_wallet))
        .route("/api/wallet/deposit", post(routes::deposit))
        .route("/api/history", get(routes::get_history).delete(routes::clear_history))
        .route("/api/history/stats", get(routes::get_history_stats))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BetLimits, BustPolicy, GameHistory, GameSession, RoundEngine, Wallet};
    use crate::types::{Difficulty, DifficultyTable};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        // External policy: advances never bust, so responses are deterministic
        let engine = RoundEngine::new(
            DifficultyTable::default(),
            BustPolicy::External { safe_moves: 2 },
            BetLimits::default(),
        );
        let session = GameSession::new(engine, Wallet::new(dec!(100)), GameHistory::new(), dec!(10), Difficulty::Easy);
        Arc::new(DashboardState::new(session, StdRng::seed_from_u64(7), "CROSSROAD", "R", 95.5))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn send(method: &str, uri: &str, json: Option<&str>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match json {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());
        let resp = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_config_endpoint() {
        let app = build_router(test_state());
        let resp = app.oneshot(get_req("/api/config")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = json_body(resp).await;
        assert_eq!(json["currency"], "R");
        assert_eq!(json["bust_policy"]["kind"], "external");
        assert_eq!(json["difficulties"].as_array().unwrap().len(), 4);
        assert_eq!(json["difficulties"][0]["difficulty"], "Easy");
        assert_eq!(json["difficulties"][0]["lanes"], 30);
    }

    #[tokio::test]
    async fn test_round_endpoint() {
        let app = build_router(test_state());
        let resp = app.oneshot(get_req("/api/round")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = json_body(resp).await;
        assert_eq!(json["status"], "idle");
        assert_eq!(json["position"], 0);
        assert_eq!(json["lanes"], 30);
    }

    #[tokio::test]
    async fn test_full_round_over_http() {
        let state = test_state();

        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/round/play", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["outcome"], "started");
        assert_eq!(json["round"]["status"], "playing");

        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/round/advance", None))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["outcome"], "advanced");
        assert_eq!(json["round"]["position"], 1);

        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/round/cash-out", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["outcome"], "cashed_out");
        assert_eq!(json["round"]["status"], "idle");

        let resp = build_router(state)
            .oneshot(get_req("/api/history/stats"))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["rounds_played"], 1);
        assert_eq!(json["rounds_won"], 1);
    }

    #[tokio::test]
    async fn test_collision_inside_safe_zone_then_bust() {
        let state = test_state();
        build_router(state.clone())
            .oneshot(send("POST", "/api/round/play", None))
            .await
            .unwrap();

        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/round/collision", None))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["outcome"], "dodged");

        for _ in 0..2 {
            build_router(state.clone())
                .oneshot(send("POST", "/api/round/advance", None))
                .await
                .unwrap();
        }
        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/round/collision", None))
            .await
            .unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["outcome"], "busted");
        assert_eq!(json["round"]["status"], "busted");

        // A busted round cannot be cashed out
        let resp = build_router(state)
            .oneshot(send("POST", "/api/round/cash-out", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_put_bet() {
        let state = test_state();
        let resp = build_router(state.clone())
            .oneshot(send("PUT", "/api/round/bet", Some(r#"{"bet_amount": 25, "difficulty": "Hard"}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["difficulty"], "Hard");
        assert_eq!(json["lanes"], 20);

        let resp = build_router(state)
            .oneshot(send("PUT", "/api/round/bet", Some(r#"{"bet_amount": 500}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_play_without_funds_is_payment_required() {
        let state = test_state();
        build_router(state.clone())
            .oneshot(send("PUT", "/api/round/bet", Some(r#"{"bet_amount": 150}"#)))
            .await
            .unwrap();
        let resp = build_router(state)
            .oneshot(send("POST", "/api/round/play", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
        let json = json_body(resp).await;
        assert!(json["error"].as_str().unwrap().contains("Insufficient funds"));
    }

    #[tokio::test]
    async fn test_wallet_deposit() {
        let state = test_state();
        let resp = build_router(state.clone())
            .oneshot(send("POST", "/api/wallet/deposit", Some(r#"{"amount": 40}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = build_router(state).oneshot(get_req("/api/wallet")).await.unwrap();
        let json = json_body(resp).await;
        assert_eq!(json["balance"].as_f64().unwrap(), 140.0);
        assert_eq!(json["transactions"][0]["kind"], "deposit");
    }

    #[tokio::test]
    async fn test_clear_history_endpoint() {
        let app = build_router(test_state());
        let resp = app.oneshot(send("DELETE", "/api/history", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_dashboard_html() {
        let app = build_router(test_state());
        let resp = app.oneshot(get_req("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("CROSSROAD"));
        assert!(html.contains("/api/round"));
        // Collision control for the external policy; cash-out allowed from lane 0
        assert!(html.contains("act('collision')"));
        assert!(!html.contains("position === 0"));
    }
}
