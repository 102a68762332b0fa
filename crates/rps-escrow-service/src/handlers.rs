//! HTTP API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use rps_escrow_core::{Address, EscrowError, Game, GameId, GameState, Move, Password};

use crate::state::{AppState, EnvError, STARTING_FUNDS};

// ============ Request/Response types ============

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CommitRequest {
    #[serde(rename = "move")]
    pub mv: Move,
    pub password: String,
}

#[derive(Deserialize)]
pub struct OpenGameRequest {
    pub game_id: String,
    pub opponent: String,
    pub wager: u64,
    pub expiry_minutes: i64,
}

#[derive(Deserialize)]
pub struct JoinGameRequest {
    #[serde(rename = "move")]
    pub mv: Move,
    pub wager: u64,
}

#[derive(Deserialize)]
pub struct RevealRequest {
    #[serde(rename = "move")]
    pub mv: Move,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TickRequest {
    pub seconds: i64,
}

#[derive(Serialize)]
pub struct GameResponse {
    pub game_id: String,
    pub creator: String,
    pub opponent: String,
    pub wager: u64,
    pub opponent_move: Move,
    pub state: GameState,
    pub created_at: String,
    pub expires_at: String,
}

// ============ Helpers ============

fn get_address_from_header(headers: &axum::http::HeaderMap) -> Option<Address> {
    headers
        .get("X-Address")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

fn game_to_response(game_id: GameId, game: &Game) -> GameResponse {
    GameResponse {
        game_id: game_id.to_string(),
        creator: game.creator.to_string(),
        opponent: game.opponent.to_string(),
        wager: game.wager,
        opponent_move: game.opponent_move,
        state: game.state,
        created_at: game.created_at.to_rfc3339(),
        expires_at: game.expires_at.to_rfc3339(),
    }
}

fn error_response(err: EnvError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        EnvError::NameTaken | EnvError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        EnvError::Engine(engine_err) => match engine_err {
            EscrowError::GameNotFound(_) => StatusCode::NOT_FOUND,
            EscrowError::NotCreator
            | EscrowError::NotDesignatedOpponent
            | EscrowError::SelfPlay => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        },
    };
    (status, Json(serde_json::json!({"error": err.to_string()})))
}

// ============ Player handlers ============

pub async fn register_player(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    match state.register_player(req.name.clone()) {
        Ok(address) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "name": req.name,
                "address": address.to_string(),
                "funds": STARTING_FUNDS,
            })),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn get_me(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let address = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "address": address.to_string(),
            "funds": state.bank_balance(address),
            "escrow_balance": state.escrow_balance(address),
        })),
    )
}

pub async fn list_players(State(state): State<AppState>) -> impl IntoResponse {
    let players: Vec<serde_json::Value> = state
        .list_players()
        .into_iter()
        .map(|(name, address)| {
            serde_json::json!({"name": name, "address": address.to_string()})
        })
        .collect();
    Json(serde_json::json!({"players": players}))
}

// ============ Commitment handlers ============

/// Compute a commitment for the caller without touching any state. The
/// password phrase is hashed into the 32-byte secret, so the same phrase
/// must be presented again at reveal time.
pub async fn compute_commitment(Json(req): Json<CommitRequest>) -> impl IntoResponse {
    let password = Password::from_phrase(&req.password);
    match GameId::commit(req.mv, &password) {
        Ok(game_id) => (
            StatusCode::OK,
            Json(serde_json::json!({"game_id": game_id.to_string()})),
        ),
        Err(err) => error_response(err.into()),
    }
}

// ============ Game handlers ============

pub async fn open_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<OpenGameRequest>,
) -> impl IntoResponse {
    let creator = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    let game_id: GameId = match req.game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    let opponent: Address = match req.opponent.parse() {
        Ok(address) => address,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid opponent address"})),
            )
        }
    };

    match state.open_game(game_id, opponent, req.wager, req.expiry_minutes, creator) {
        Ok(game) => (
            StatusCode::OK,
            Json(serde_json::json!(game_to_response(game_id, &game))),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    let games: Vec<GameResponse> = state
        .list_games()
        .iter()
        .map(|(game_id, game)| game_to_response(*game_id, game))
        .collect();
    Json(serde_json::json!({"games": games}))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> impl IntoResponse {
    let game_id: GameId = match game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    match state.game(game_id) {
        Some(game) => (
            StatusCode::OK,
            Json(serde_json::json!(game_to_response(game_id, &game))),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Game not found"})),
        ),
    }
}

pub async fn join_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(game_id): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> impl IntoResponse {
    let joiner = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    let game_id: GameId = match game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    match state.join_game(game_id, req.mv, req.wager, joiner) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "joined"})),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn reveal_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(game_id): Path<String>,
    Json(req): Json<RevealRequest>,
) -> impl IntoResponse {
    let revealer = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    let game_id: GameId = match game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    let password = Password::from_phrase(&req.password);
    match state.resolve(game_id, req.mv, &password, revealer) {
        Ok(winner) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "resolved",
                "winner": winner.map(|w| w.to_string()),
            })),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn reclaim_game(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(game_id): Path<String>,
) -> impl IntoResponse {
    let claimant = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    let game_id: GameId = match game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    match state.reclaim_no_opponent(game_id, claimant) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "reclaimed", "amount": amount})),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn claim_timeout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Path(game_id): Path<String>,
) -> impl IntoResponse {
    let claimant = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    let game_id: GameId = match game_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid game id"})),
            )
        }
    };

    match state.reclaim_no_reveal(game_id, claimant) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "reclaimed", "amount": amount})),
        ),
        Err(err) => error_response(err),
    }
}

// ============ Balance handlers ============

pub async fn withdraw(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let caller = match get_address_from_header(&headers) {
        Some(address) => address,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Missing X-Address header"})),
            )
        }
    };

    match state.withdraw(caller) {
        Ok(amount) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "amount": amount,
                "funds": state.bank_balance(caller),
            })),
        ),
        Err(err) => error_response(err),
    }
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> impl IntoResponse {
    let address: Address = match address.parse() {
        Ok(address) => address,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Invalid address"})),
            )
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "address": address.to_string(),
            "escrow_balance": state.escrow_balance(address),
            "funds": state.bank_balance(address),
        })),
    )
}

// ============ Event handlers ============

pub async fn list_events(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"events": state.events()}))
}

// ============ System handlers ============

pub async fn tick(State(state): State<AppState>, Json(req): Json<TickRequest>) -> impl IntoResponse {
    state.advance_time(req.seconds);
    Json(serde_json::json!({"now": state.now().to_rfc3339()}))
}
