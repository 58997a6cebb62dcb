//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{
    Board, GameError, GameSession, GameStatus, GameType, Move, MoveReport, MoveRequest, MoveResult,
};
use crate::store::{Player, StoreError};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let origins = if state.config.client_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        // comma-separated list of origins
        let allowed_origins: Vec<HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        AllowOrigin::list(allowed_origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let user_routes = Router::new()
        .route("/", post(create_user_handler))
        .route("/:id", get(get_user_handler));

    let game_routes = Router::new()
        .route("/create", post(create_game_handler))
        .route("/:id", get(get_game_handler))
        .route("/:id/join", post(join_game_handler))
        .route("/:id/moves", get(game_moves_handler))
        .route("/:id/place-ships/:player_id", post(place_ships_handler))
        .route("/user/:id/history", get(history_handler));

    let play_routes = Router::new().route("/:id/move", post(move_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/users", user_routes)
        .nest("/api/game", game_routes)
        .nest("/api/play", play_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_games: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_games: state.games.active_games(),
    })
}

// ============================================================================
// User endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateUserRequest {
    name: String,
}

async fn create_user_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Player>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    let player = state.games.players().create_player(name)?;
    Ok((StatusCode::CREATED, Json(player)))
}

async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Player>, AppError> {
    Ok(Json(state.games.players().get_player(id)?))
}

// ============================================================================
// Game endpoints
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest {
    creator_id: Uuid,
    game_type: GameType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinGameRequest {
    player_id: Uuid,
}

/// Game summary with player names resolved
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameView {
    id: Uuid,
    #[serde(rename = "type")]
    game_type: GameType,
    status: GameStatus,
    player1_id: Uuid,
    player1_name: Option<String>,
    player2_id: Option<Uuid>,
    player2_name: Option<String>,
    winner_id: Option<Uuid>,
    winner_name: Option<String>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl GameView {
    fn new(state: &AppState, game: GameSession) -> Self {
        let name_of = |id: Option<Uuid>| {
            id.and_then(|id| state.games.players().get_player(id).ok())
                .map(|p| p.name)
        };

        Self {
            id: game.id,
            game_type: game.game_type,
            status: game.status,
            player1_id: game.player1,
            player1_name: name_of(Some(game.player1)),
            player2_id: game.player2,
            player2_name: name_of(game.player2),
            winner_id: game.winner,
            winner_name: name_of(game.winner),
            created_at: game.created_at,
            finished_at: game.finished_at,
        }
    }
}

async fn create_game_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameView>), AppError> {
    let game = state.games.create_game(req.creator_id, req.game_type)?;
    Ok((StatusCode::CREATED, Json(GameView::new(&state, game))))
}

async fn join_game_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<JoinGameRequest>,
) -> Result<Json<GameView>, AppError> {
    let game = state.games.join_game(id, req.player_id)?;
    Ok(Json(GameView::new(&state, game)))
}

async fn get_game_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    let game = state.games.get_game(id)?;
    Ok(Json(GameView::new(&state, game)))
}

async fn history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<GameView>>, AppError> {
    let games = state.games.game_history(id)?;
    Ok(Json(
        games
            .into_iter()
            .map(|g| GameView::new(&state, g))
            .collect(),
    ))
}

#[derive(Deserialize)]
struct PlaceShipsRequest {
    /// 10 rows of 10 cells, 1 = ship, 0 = water
    field: Vec<Vec<u8>>,
}

async fn place_ships_handler(
    State(state): State<AppState>,
    Path((id, player_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<PlaceShipsRequest>,
) -> Result<StatusCode, AppError> {
    let layout = Board::from_rows(&req.field)?;
    state.games.submit_placement(id, player_id, &layout)?;
    Ok(StatusCode::OK)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveView {
    player_id: Uuid,
    player_name: Option<String>,
    x: u8,
    y: u8,
    result: MoveResult,
    created_at: DateTime<Utc>,
}

async fn game_moves_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MoveView>>, AppError> {
    let moves: Vec<Move> = state.games.game_moves(id)?;
    Ok(Json(
        moves
            .into_iter()
            .map(|m| MoveView {
                player_name: state.games.players().get_player(m.player_id).ok().map(|p| p.name),
                player_id: m.player_id,
                x: m.x,
                y: m.y,
                result: m.result,
                created_at: m.created_at,
            })
            .collect(),
    ))
}

// ============================================================================
// Play endpoint
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MakeMoveRequest {
    player_id: Uuid,
    x: i32,
    y: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveResponse {
    #[serde(flatten)]
    report: MoveReport,
    message: String,
}

fn describe(result: MoveResult) -> &'static str {
    match result {
        MoveResult::Hit => "hit",
        MoveResult::Miss => "miss",
        MoveResult::Sunk => "sunk",
        MoveResult::Invalid => "invalid",
    }
}

/// Human readable summary of one exchange
fn summarize(state: &AppState, report: &MoveReport) -> String {
    let mut message = format!(
        "Your move ({},{}) - {}",
        report.x,
        report.y,
        describe(report.player_result)
    );

    if !report.ai_moves.is_empty() {
        let ai: Vec<String> = report
            .ai_moves
            .iter()
            .map(|m| format!("({},{}) - {}", m.x, m.y, describe(m.result)))
            .collect();
        message.push_str(&format!(". AI fired: {}", ai.join("; ")));
    }

    if report.status == GameStatus::Finished {
        let winner = report
            .winner
            .and_then(|id| state.games.players().get_player(id).ok())
            .map(|p| p.name)
            .unwrap_or_else(|| "unknown".to_string());
        message.push_str(&format!(". Game over! Winner: {}", winner));
    }

    message
}

async fn move_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MakeMoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let request = MoveRequest {
        player_id: req.player_id,
        x: req.x,
        y: req.y,
    };
    let report = state.games.process_move(id, request)?;
    let message = summarize(&state, &report);

    Ok(Json(MoveResponse { report, message }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::Store(StoreError::Backend(msg)) => AppError::Internal(msg),
            e if e.is_not_found() => AppError::NotFound(e.to_string()),
            e => AppError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => {
                warn!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
