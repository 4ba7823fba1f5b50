use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage condition and which collaborators are configured.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_score_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "score store health check failed");
            }
        }
        Err(_) => warn!("score store unavailable (degraded mode)"),
    }

    let config = state.config();
    HealthResponse::new(
        state.is_degraded(),
        config.sheets().spreadsheet_id.is_some(),
        config.social().bearer_token.is_some(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        config::AppConfig, dao::score_store::InMemoryScoreStore, dto::health::HealthStatus,
        state::AppState,
    };

    use super::*;

    #[tokio::test]
    async fn reports_degraded_until_storage_is_installed() {
        let state = AppState::new(AppConfig::default());
        let health = health_status(&state).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(!health.sheets_configured);

        state
            .set_score_store(Arc::new(InMemoryScoreStore::new()))
            .await;
        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);
    }
}
