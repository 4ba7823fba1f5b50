use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use validator::Validate;

use crate::{
    dto::sync::{SubmitScoresRequest, SyncReport, SyncRequest},
    error::AppError,
    services::reconcile_service,
    state::SharedState,
};

/// Reconciliation of sheet rows against the stored ledger.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rounds/{number}/scores", post(submit_scores))
        .route("/rounds/{number}/sync", post(sync_round))
}

/// Reconcile rows posted in the body.
///
/// Rows are normalized for the requested day first: played holes without a value count
/// as a failed puzzle.
#[utoipa::path(
    post,
    path = "/rounds/{number}/scores",
    tag = "scores",
    params(("number" = u32, Path, description = "Round number")),
    request_body = SubmitScoresRequest,
    responses(
        (status = 200, description = "Changes applied to the ledger", body = SyncReport),
        (status = 400, description = "Invalid rows"),
        (status = 409, description = "Rows reference holes outside the round")
    )
)]
pub async fn submit_scores(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<SubmitScoresRequest>,
) -> Result<Json<SyncReport>, AppError> {
    payload.validate()?;
    Ok(Json(
        reconcile_service::submit_scores(&state, number, payload).await?,
    ))
}

/// Reconcile the round's spreadsheet, optionally completing today's hole from social posts.
#[utoipa::path(
    post,
    path = "/rounds/{number}/sync",
    tag = "scores",
    params(("number" = u32, Path, description = "Round number")),
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Changes applied to the ledger", body = SyncReport),
        (status = 500, description = "Spreadsheet or social credentials missing"),
        (status = 502, description = "Spreadsheet or social request failed")
    )
)]
pub async fn sync_round(
    State(state): State<SharedState>,
    Path(number): Path<u32>,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    payload.validate()?;
    Ok(Json(
        reconcile_service::sync_round(&state, number, payload).await?,
    ))
}
