mod report_cache;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::warn;

use crate::{
    clients::{SheetsClient, SocialClient},
    config::AppConfig,
    dao::score_store::ScoreStore,
    error::ServiceError,
};

pub use self::report_cache::{ReportCache, RoundReport};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, configuration, clients and caches.
pub struct AppState {
    score_store: RwLock<Option<Arc<dyn ScoreStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    reports: ReportCache,
    sheets: Option<SheetsClient>,
    social: Option<SocialClient>,
    sync_gates: DashMap<u32, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let sheets = SheetsClient::new(config.sheets().clone())
            .inspect_err(|err| warn!(error = %err, "spreadsheet client unavailable"))
            .ok();
        let social = SocialClient::new(config.social().clone())
            .inspect_err(|err| warn!(error = %err, "social client unavailable"))
            .ok();
        let (degraded_tx, _rx) = watch::channel(true);

        Arc::new(Self {
            score_store: RwLock::new(None),
            degraded: degraded_tx,
            reports: ReportCache::new(config.report_cache_ttl()),
            config,
            sheets,
            social,
            sync_gates: DashMap::new(),
        })
    }

    /// Obtain a handle to the current score store, if one is installed.
    pub async fn score_store(&self) -> Option<Arc<dyn ScoreStore>> {
        let guard = self.score_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current score store, or [`ServiceError::Degraded`] when none is usable.
    pub async fn require_score_store(&self) -> Result<Arc<dyn ScoreStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.score_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new score store implementation and leave degraded mode.
    pub async fn set_score_store(&self, store: Arc<dyn ScoreStore>) {
        {
            let mut guard = self.score_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Cache of built round reports.
    pub fn reports(&self) -> &ReportCache {
        &self.reports
    }

    pub fn sheets(&self) -> Result<&SheetsClient, ServiceError> {
        self.sheets
            .as_ref()
            .ok_or_else(|| ServiceError::Configuration("spreadsheet client".into()))
    }

    pub fn social(&self) -> Result<&SocialClient, ServiceError> {
        self.social
            .as_ref()
            .ok_or_else(|| ServiceError::Configuration("social client".into()))
    }

    /// Gate serializing reconciliation runs of one round.
    pub fn sync_gate(&self, round_number: u32) -> Arc<Mutex<()>> {
        self.sync_gates
            .entry(round_number)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::dao::score_store::InMemoryScoreStore;

    use super::*;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(matches!(
            state.require_score_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_score_store(Arc::new(InMemoryScoreStore::new()))
            .await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_score_store().await.is_ok());

        state.update_degraded(false);
        assert!(!watcher.has_changed().unwrap());
    }

    #[test]
    fn sync_gates_are_shared_per_round() {
        let state = AppState::new(AppConfig::default());
        assert!(Arc::ptr_eq(&state.sync_gate(3), &state.sync_gate(3)));
        assert!(!Arc::ptr_eq(&state.sync_gate(3), &state.sync_gate(4)));
    }
}
