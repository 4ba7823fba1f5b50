use std::{iter, time::Duration};

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};
use crate::config::StorageSettings;

/// Ping schedule followed until the database first answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRetry {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ConnectRetry {
    /// Pauses between consecutive pings, doubling up to `max_delay`.
    fn delays(self) -> impl Iterator<Item = Duration> {
        let max_delay = self.max_delay;
        iter::successors(Some(self.initial_delay.min(max_delay)), move |delay| {
            Some(delay.saturating_mul(2).min(max_delay))
        })
        .take(self.attempts.saturating_sub(1) as usize)
    }
}

impl From<&StorageSettings> for ConnectRetry {
    fn from(settings: &StorageSettings) -> Self {
        Self {
            attempts: settings.connect_attempts.max(1),
            initial_delay: settings.connect_delay,
            max_delay: settings.connect_max_delay,
        }
    }
}

/// Build a client for `config` and wait until the database answers a ping.
pub async fn establish_connection(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);
    let mut delays = config.retry.delays();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => break,
            Err(err) => err,
        };
        let Some(delay) = delays.next() else {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        };
        debug!(attempts, ?delay, error = %err, "MongoDB ping failed, retrying");
        sleep(delay).await;
    }

    info!(database = %config.database_name, attempts, "MongoDB reachable");
    Ok((client, database))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn delays_double_until_the_cap() {
        let retry = ConnectRetry {
            attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(retry.delays().collect::<Vec<_>>(), millis(&[200, 400, 500, 500]));
    }

    #[test]
    fn single_attempt_never_waits() {
        let settings = StorageSettings {
            connect_attempts: 1,
            ..StorageSettings::default()
        };
        assert_eq!(ConnectRetry::from(&settings).delays().count(), 0);
    }

    #[test]
    fn configured_schedule_reaches_the_connection() {
        let settings = StorageSettings {
            connect_attempts: 3,
            connect_delay: Duration::from_millis(10),
            ..StorageSettings::default()
        };
        let retry = ConnectRetry::from(&settings);
        assert_eq!(retry.attempts, 3);
        assert_eq!(retry.delays().collect::<Vec<_>>(), millis(&[10, 20]));
    }
}
