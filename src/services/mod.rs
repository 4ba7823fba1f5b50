/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Sheet reconciliation against the score ledger.
pub mod reconcile_service;
/// Leaderboards and statistics built from the ledger.
pub mod report_service;
/// Calendar lookups, rounds and rosters.
pub mod round_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
