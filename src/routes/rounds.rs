use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use validator::Validate;

use crate::{
    dto::round::{
        AddPlayerRequest, CopyPlayersRequest, CreateRoundRequest, PlayerSummary,
        RosterResponse, RoundSummary,
    },
    error::AppError,
    services::round_service,
    state::SharedState,
};

/// Round creation and roster management.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rounds", get(list_rounds).post(create_round))
        .route(
            "/rounds/{number}/players",
            get(list_players).post(add_player),
        )
        .route(
            "/rounds/{number}/players/{username}",
            delete(remove_player),
        )
        .route("/rounds/{number}/players/copy", post(copy_players))
        .route("/rounds/{number}/players/sync", post(sync_players))
}

#[utoipa::path(
    get,
    path = "/rounds",
    tag = "rounds",
    responses((status = 200, description = "Rounds ordered by number", body = [RoundSummary]))
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    Ok(Json(round_service::list_rounds(&state).await?))
}

/// Create a round and its eighteen holes.
#[utoipa::path(
    post,
    path = "/rounds",
    tag = "rounds",
    request_body = CreateRoundRequest,
    responses(
        (status = 200, description = "Round created (or already present)", body = RoundSummary),
        (status = 409, description = "Round overlaps another or exists with another start date")
    )
)]
pub async fn create_round(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRoundRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    let round = round_service::create_round(&state, payload.number, payload.start_date).await?;
    Ok(Json(round))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/players",
    tag = "rounds",
    params(("number" = u32, Path, description = "Round number")),
    responses((status = 200, description = "Enrolled players", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(round_service::list_players(&state, number).await?))
}

/// Enroll a player, creating the user on first sight.
#[utoipa::path(
    post,
    path = "/rounds/{number}/players",
    tag = "rounds",
    params(("number" = u32, Path, description = "Round number")),
    request_body = AddPlayerRequest,
    responses(
        (status = 200, description = "Player enrolled", body = PlayerSummary),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<AddPlayerRequest>,
) -> Result<Json<PlayerSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        round_service::add_player(&state, number, payload).await?,
    ))
}

/// Withdraw a player; their recorded scores are kept.
#[utoipa::path(
    delete,
    path = "/rounds/{number}/players/{username}",
    tag = "rounds",
    params(
        ("number" = u32, Path, description = "Round number"),
        ("username" = String, Path, description = "Player to withdraw")
    ),
    responses(
        (status = 204, description = "Player withdrawn"),
        (status = 404, description = "Player not enrolled")
    )
)]
pub async fn remove_player(
    State(state): State<SharedState>,
    Path((number, username)): Path<(u32, String)>,
) -> Result<StatusCode, AppError> {
    round_service::remove_player(&state, number, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/rounds/{number}/players/copy",
    tag = "rounds",
    params(("number" = u32, Path, description = "Round receiving the players")),
    request_body = CopyPlayersRequest,
    responses((status = 200, description = "Roster after the copy", body = RosterResponse))
)]
pub async fn copy_players(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<CopyPlayersRequest>,
) -> Result<Json<RosterResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        round_service::copy_players(&state, number, payload.from_round).await?,
    ))
}

/// Enroll every player listed on the round's sheet.
#[utoipa::path(
    post,
    path = "/rounds/{number}/players/sync",
    tag = "rounds",
    params(("number" = u32, Path, description = "Round number")),
    responses(
        (status = 200, description = "Roster after the sync", body = RosterResponse),
        (status = 502, description = "Spreadsheet request failed")
    )
)]
pub async fn sync_players(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<RosterResponse>, AppError> {
    Ok(Json(round_service::sync_players(&state, number).await?))
}
