use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use time::{Date, macros::format_description};

use crate::{
    dto::calendar::PuzzleDayResponse, error::AppError, services::round_service,
    state::SharedState,
};

/// Puzzle day lookups by date, by number, or for today.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/calendar/today", get(today))
        .route("/calendar/dates/{date}", get(by_date))
        .route("/calendar/days/{number}", get(by_number))
}

#[utoipa::path(
    get,
    path = "/calendar/today",
    tag = "calendar",
    responses((status = 200, description = "Today's puzzle", body = PuzzleDayResponse))
)]
/// Puzzle played today in the configured timezone.
pub async fn today(State(state): State<SharedState>) -> Result<Json<PuzzleDayResponse>, AppError> {
    Ok(Json(round_service::puzzle_day_for_date(&state, None).await?))
}

#[utoipa::path(
    get,
    path = "/calendar/dates/{date}",
    tag = "calendar",
    params(("date" = String, Path, description = "Day formatted as YYYY-MM-DD")),
    responses(
        (status = 200, description = "Puzzle of that day", body = PuzzleDayResponse),
        (status = 400, description = "Malformed date")
    )
)]
pub async fn by_date(
    State(state): State<SharedState>,
    Path(date): Path<String>,
) -> Result<Json<PuzzleDayResponse>, AppError> {
    let date = Date::parse(&date, format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::BadRequest(format!("invalid date `{date}`: {err}")))?;
    Ok(Json(
        round_service::puzzle_day_for_date(&state, Some(date)).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/calendar/days/{number}",
    tag = "calendar",
    params(("number" = i64, Path, description = "Puzzle number counted from the epoch")),
    responses(
        (status = 200, description = "Date and hole of that puzzle", body = PuzzleDayResponse),
        (status = 400, description = "Puzzle number out of range")
    )
)]
pub async fn by_number(
    State(state): State<SharedState>,
    Path(number): Path<i64>,
) -> Result<Json<PuzzleDayResponse>, AppError> {
    Ok(Json(
        round_service::puzzle_day_for_number(&state, number).await?,
    ))
}
