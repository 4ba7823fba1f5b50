use serde::Serialize;
use utoipa::ToSchema;

/// Overall service condition.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    /// No usable score store; read and write routes answer 503.
    Degraded,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// A spreadsheet is configured for sheet-driven syncs.
    pub sheets_configured: bool,
    /// Social lookups have credentials.
    pub social_configured: bool,
}

impl HealthResponse {
    pub fn new(degraded: bool, sheets_configured: bool, social_configured: bool) -> Self {
        Self {
            status: if degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Ok
            },
            sheets_configured,
            social_configured,
        }
    }
}
