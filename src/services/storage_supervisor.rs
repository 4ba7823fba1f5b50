use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{score_store::ScoreStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Connect to the score store and keep watching it.
///
/// The shared state stays degraded while no connection exists, and falls back to
/// degraded as soon as a health check fails and the first reconnect attempt does too.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ScoreStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_score_store(store.clone()).await;
                info!("score store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch(&state, store.as_ref()).await;
                warn!("score store lost; reconnecting from scratch");
            }
            Err(err) => warn!(error = %err, "score store connection attempt failed"),
        }

        sleep(delay).await;
        delay = backoff(delay);
    }
}

/// Poll the store until it fails and cannot be revived in place.
async fn watch(state: &SharedState, store: &dyn ScoreStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("score store healthy again; leaving degraded mode");
                state.update_degraded(false);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !reconnect(state, store).await {
            return;
        }
        state.update_degraded(false);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn ScoreStore) -> bool {
    let mut delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "score store reconnected after failed health check");
                return true;
            }
            Err(err) if attempt == 0 => {
                warn!(attempt, error = %err, "score store reconnect failed; entering degraded mode");
                state.update_degraded(true);
            }
            Err(err) => warn!(attempt, error = %err, "score store reconnect attempt failed"),
        }
        sleep(delay).await;
        delay = backoff(delay);
    }

    warn!("score store reconnect attempts exhausted; staying in degraded mode");
    false
}
