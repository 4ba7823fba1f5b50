use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Wordle golf backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::calendar::today,
        crate::routes::calendar::by_date,
        crate::routes::calendar::by_number,
        crate::routes::rounds::list_rounds,
        crate::routes::rounds::create_round,
        crate::routes::rounds::list_players,
        crate::routes::rounds::add_player,
        crate::routes::rounds::remove_player,
        crate::routes::rounds::copy_players,
        crate::routes::rounds::sync_players,
        crate::routes::scores::submit_scores,
        crate::routes::scores::sync_round,
        crate::routes::reports::leaderboard,
        crate::routes::reports::stats,
        crate::routes::reports::breakdown,
        crate::routes::reports::race,
        crate::routes::reports::missing,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::calendar::PuzzleDayResponse,
            crate::dto::round::CreateRoundRequest,
            crate::dto::round::RoundSummary,
            crate::dto::round::AddPlayerRequest,
            crate::dto::round::CopyPlayersRequest,
            crate::dto::round::PlayerSummary,
            crate::dto::round::RosterResponse,
            crate::dto::sync::SubmitScoresRequest,
            crate::dto::sync::SyncRequest,
            crate::dto::sync::SyncReport,
            crate::dto::sync::ScoreChange,
            crate::dto::sync::ChangeKind,
            crate::dto::report::LeaderboardResponse,
            crate::dto::report::LeaderboardEntry,
            crate::dto::report::StatsResponse,
            crate::dto::report::HoleStats,
            crate::dto::report::BreakdownResponse,
            crate::dto::report::BreakdownEntry,
            crate::dto::report::RaceResponse,
            crate::dto::report::RaceDay,
            crate::dto::report::RaceStanding,
            crate::dto::report::MissingResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "calendar", description = "Puzzle numbers, dates and holes"),
        (name = "rounds", description = "Rounds and their rosters"),
        (name = "scores", description = "Score reconciliation"),
        (name = "reports", description = "Leaderboards and statistics"),
    )
)]
pub struct ApiDoc;
