use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::report::{
        BreakdownResponse, LeaderboardResponse, MissingQuery, MissingResponse, RaceQuery,
        RaceResponse, StatsResponse,
    },
    error::AppError,
    services::report_service,
    state::SharedState,
};

/// Read-only aggregates over a round's ledger.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rounds/{number}/leaderboard", get(leaderboard))
        .route("/rounds/{number}/stats", get(stats))
        .route("/rounds/{number}/breakdown", get(breakdown))
        .route("/rounds/{number}/race", get(race))
        .route("/rounds/{number}/missing", get(missing))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/leaderboard",
    tag = "reports",
    params(("number" = u32, Path, description = "Round number")),
    responses(
        (status = 200, description = "Players ordered by golf score", body = LeaderboardResponse),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(report_service::leaderboard(&state, number).await?))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/stats",
    tag = "reports",
    params(("number" = u32, Path, description = "Round number")),
    responses((status = 200, description = "Per-hole aggregates", body = StatsResponse))
)]
/// Count, total and average of every played hole.
pub async fn stats(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(report_service::hole_stats(&state, number).await?))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/breakdown",
    tag = "reports",
    params(("number" = u32, Path, description = "Round number")),
    responses((status = 200, description = "Score names counted per hole", body = BreakdownResponse))
)]
pub async fn breakdown(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
) -> Result<Json<BreakdownResponse>, AppError> {
    Ok(Json(report_service::breakdown(&state, number).await?))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/race",
    tag = "reports",
    params(("number" = u32, Path, description = "Round number"), RaceQuery),
    responses((status = 200, description = "Cumulative standings per hole", body = RaceResponse))
)]
pub async fn race(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Query(query): Query<RaceQuery>,
) -> Result<Json<RaceResponse>, AppError> {
    query.validate()?;
    Ok(Json(
        report_service::race(&state, number, query.limit).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/rounds/{number}/missing",
    tag = "reports",
    params(("number" = u32, Path, description = "Round number"), MissingQuery),
    responses(
        (status = 200, description = "Enrolled players without a score", body = MissingResponse),
        (status = 409, description = "Round not started and no hole given")
    )
)]
/// Players still owing a score on a hole.
pub async fn missing(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Query(query): Query<MissingQuery>,
) -> Result<Json<MissingResponse>, AppError> {
    query.validate()?;
    Ok(Json(
        report_service::missing(&state, number, query.hole).await?,
    ))
}
