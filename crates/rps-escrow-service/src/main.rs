//! RPS Escrow Service
//!
//! HTTP hosting environment for wagered rock-paper-scissors: commit-reveal
//! games, a per-player bank, and a tickable clock for playing out expiries.

mod handlers;
mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handlers::*;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new();

    // Pre-register demo players so the API is playable immediately
    for name in ["alice", "bob"] {
        if let Ok(address) = state.register_player(name.to_string()) {
            tracing::info!("Registered demo player {} at {}", name, address);
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Players
        .route("/api/player/register", post(register_player))
        .route("/api/player/me", get(get_me))
        .route("/api/players", get(list_players))
        // Commitments
        .route("/api/commit", post(compute_commitment))
        // Games
        .route("/api/games", post(open_game))
        .route("/api/games", get(list_games))
        .route("/api/games/:id", get(get_game))
        .route("/api/games/:id/join", post(join_game))
        .route("/api/games/:id/reveal", post(reveal_game))
        .route("/api/games/:id/reclaim", post(reclaim_game))
        .route("/api/games/:id/claim-timeout", post(claim_timeout))
        // Balances
        .route("/api/withdraw", post(withdraw))
        .route("/api/balance/:address", get(get_balance))
        // Events
        .route("/api/events", get(list_events))
        // System
        .route("/api/system/tick", post(tick))
        // Health
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("RPS escrow service starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health() -> &'static str {
    "ok"
}
