//! HTTP-level tests running the full router over the in-memory score store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wordle_golf_back::{
    app::build_router, config::AppConfig, dao::score_store::InMemoryScoreStore, state::AppState,
};

async fn setup_app() -> Router {
    let state = AppState::new(AppConfig::default());
    state
        .set_score_store(Arc::new(InMemoryScoreStore::new()))
        .await;
    build_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn round_with_players(app: &Router, players: &[&str]) {
    let (status, _) = send(
        app,
        "POST",
        "/rounds",
        Some(json!({"number": 1, "start_date": "2022-05-09"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for player in players {
        let (status, _) = send(
            app,
            "POST",
            "/rounds/1/players",
            Some(json!({"username": player, "social_id": format!("{player}-id")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn healthcheck_reports_degraded_without_storage() {
    let app = build_router(AppState::new(AppConfig::default()));

    let (status, body) = send(&app, "GET", "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");

    let (status, _) = send(&app, "GET", "/rounds", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = setup_app().await;
    let (_, body) = send(&app, "GET", "/healthcheck", None).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn rounds_reject_invalid_or_conflicting_definitions() {
    let app = setup_app().await;
    round_with_players(&app, &[]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/rounds",
        Some(json!({"number": 1, "start_date": "2022-05-09"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["end_date"], "2022-05-26");

    let (status, _) = send(
        &app,
        "POST",
        "/rounds",
        Some(json!({"number": 2, "start_date": "2022-05-20"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/rounds",
        Some(json!({"number": 0, "start_date": "2022-06-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calendar_maps_dates_to_holes() {
    let app = setup_app().await;
    round_with_players(&app, &[]).await;

    let (status, body) = send(&app, "GET", "/calendar/dates/2022-05-10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number"], 325);
    assert_eq!(body["round_number"], 1);
    assert_eq!(body["hole_number"], 2);

    let (_, body) = send(&app, "GET", "/calendar/days/345", None).await;
    assert_eq!(body["date"], "2022-05-30");
    assert_eq!(body["round_number"], Value::Null);

    let (status, _) = send(&app, "GET", "/calendar/dates/10-05-2022", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posted_scores_feed_the_leaderboard_once() {
    let app = setup_app().await;
    round_with_players(&app, &["alice", "bob"]).await;

    let rows = json!({
        "rows": {"bob": ["5", "X"], "alice": ["3", "4"], "mallory": ["1"]},
        "date": "2022-05-11"
    });
    let (status, body) = send(&app, "POST", "/rounds/1/scores", Some(rows.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hole_number"], 3);
    // "X" does not parse as a score and is skipped.
    assert_eq!(body["created"], 3);
    assert_eq!(body["skipped_players"], json!(["mallory"]));

    let (status, body) = send(&app, "POST", "/rounds/1/scores", Some(rows)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 0);
    assert_eq!(body["updated"], 0);

    let (status, body) = send(&app, "GET", "/rounds/1/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["user"], "alice");
    assert_eq!(entries[0]["golf_score"], -1);
    assert_eq!(entries[1]["user"], "bob");
    assert_eq!(entries[1]["holes"][1], Value::Null);

    let (_, body) = send(&app, "GET", "/rounds/1/missing?hole=2", None).await;
    assert_eq!(body["players"], json!(["bob"]));
}

#[tokio::test]
async fn score_rows_are_validated() {
    let app = setup_app().await;
    round_with_players(&app, &["alice"]).await;

    let too_long: Vec<&str> = vec!["4"; 19];
    let (status, _) = send(
        &app,
        "POST",
        "/rounds/1/scores",
        Some(json!({"rows": {"alice": too_long}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/rounds/1/missing?hole=19", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/rounds/9/scores", Some(json!({"rows": {"alice": ["3"]}}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn withdrawn_players_can_only_be_removed_once() {
    let app = setup_app().await;
    round_with_players(&app, &["alice", "bob"]).await;

    let (status, _) = send(&app, "DELETE", "/rounds/1/players/bob", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/rounds/1/players/bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/rounds/1/players", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["username"], "alice");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_app().await;
    let (status, body) = send(&app, "GET", "/api-doc/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/rounds/{number}/leaderboard"].is_object());
}
