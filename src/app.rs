//! Process wiring shared by the HTTP server and the sync CLI.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::AppConfig,
    dao::score_store::{InMemoryScoreStore, ScoreStore},
    routes,
    state::SharedState,
};

#[cfg(feature = "mongo-store")]
use crate::{
    dao::{
        score_store::mongodb::{MongoConfig, MongoScoreStore},
        storage::StorageError,
    },
    services::storage_supervisor,
};

/// Score store selected through `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store; everything is lost on exit.
    Memory,
    Mongo,
}

impl StorageBackend {
    /// Parse `STORAGE_BACKEND`, defaulting to MongoDB.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::parse(env::var("STORAGE_BACKEND").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> anyhow::Result<Self> {
        match value.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("mongo") | Some("mongodb") => Ok(Self::Mongo),
            Some("memory") => Ok(Self::Memory),
            Some(other) => bail!("unknown STORAGE_BACKEND `{other}` (expected memory or mongo)"),
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
pub fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the score store for a long-running server.
///
/// MongoDB is connected in the background by the storage supervisor; the server answers
/// in degraded mode until the first connection succeeds.
pub async fn start_storage(state: &SharedState, backend: StorageBackend) -> anyhow::Result<()> {
    match backend {
        StorageBackend::Memory => {
            info!("using the in-memory score store");
            state
                .set_score_store(Arc::new(InMemoryScoreStore::new()))
                .await;
            Ok(())
        }
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            let config = MongoConfig::from_env(state.config().storage())
                .await
                .context("reading MongoDB settings")?;
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let config = config.clone();
                async move {
                    MongoScoreStore::connect(config)
                        .await
                        .map(|store| Arc::new(store) as Arc<dyn ScoreStore>)
                        .map_err(StorageError::from)
                }
            }));
            Ok(())
        }
        #[cfg(not(feature = "mongo-store"))]
        StorageBackend::Mongo => bail!("built without the `mongo-store` feature"),
    }
}

/// Connect the score store once, for short-lived processes.
#[cfg_attr(not(feature = "mongo-store"), allow(unused_variables))]
pub async fn connect_storage(
    backend: StorageBackend,
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn ScoreStore>> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryScoreStore::new())),
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            let config = MongoConfig::from_env(config.storage())
                .await
                .context("reading MongoDB settings")?;
            let store = MongoScoreStore::connect(config)
                .await
                .context("connecting to MongoDB")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo-store"))]
        StorageBackend::Mongo => bail!("built without the `mongo-store` feature"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_defaults_to_mongo() {
        assert_eq!(StorageBackend::parse(None).unwrap(), StorageBackend::Mongo);
        assert_eq!(
            StorageBackend::parse(Some(" Memory ")).unwrap(),
            StorageBackend::Memory
        );
        assert!(StorageBackend::parse(Some("couch")).is_err());
    }
}
