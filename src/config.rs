//! Application-level configuration loading: competition calendar, storage, spreadsheet
//! and social platform settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use time::{Date, UtcOffset};
use tracing::{info, warn};

use crate::scoring::{calendar::DEFAULT_PUZZLE_EPOCH, normalizer::DEFAULT_FILLER};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORDLE_GOLF_CONFIG_PATH";
/// The competition runs on US Central time.
const DEFAULT_UTC_OFFSET_HOURS: i8 = -5;
const DEFAULT_REPORT_TTL_SECS: u64 = 60;
const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4";
const DEFAULT_USER_RANGE: &str = "A2:A1000";
const DEFAULT_SCORE_RANGE: &str = "C2:T1000";
const DEFAULT_SOCIAL_URL: &str = "https://api.twitter.com/2";
const DEFAULT_SOCIAL_DELAY_MS: u64 = 1000;
const DEFAULT_DATABASE: &str = "wordle_golf";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_CONNECT_DELAY_MS: u64 = 200;
const DEFAULT_CONNECT_MAX_DELAY_MS: u64 = 3_000;

/// Score store database and the ping schedule used while it is first reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub database: String,
    /// Pings sent before giving up; never below 1.
    pub connect_attempts: u32,
    /// Pause after the first failed ping, doubled after each further failure.
    pub connect_delay: Duration,
    pub connect_max_delay: Duration,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.into(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_delay: Duration::from_millis(DEFAULT_CONNECT_DELAY_MS),
            connect_max_delay: Duration::from_millis(DEFAULT_CONNECT_MAX_DELAY_MS),
        }
    }
}

/// Spreadsheet location and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: Option<String>,
    /// Fixed tab name; `None` means `"Round {n}"`.
    pub sheet_name: Option<String>,
    pub user_range: String,
    pub score_range: String,
    pub api_key: Option<String>,
    /// OAuth token required for write-back; the client is read-only without it.
    pub access_token: Option<String>,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHEETS_URL.into(),
            spreadsheet_id: None,
            sheet_name: None,
            user_range: DEFAULT_USER_RANGE.into(),
            score_range: DEFAULT_SCORE_RANGE.into(),
            api_key: None,
            access_token: None,
        }
    }
}

/// Social platform endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialSettings {
    pub base_url: String,
    /// Pause between two per-user searches.
    pub request_delay: Duration,
    pub bearer_token: Option<String>,
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOCIAL_URL.into(),
            request_delay: Duration::from_millis(DEFAULT_SOCIAL_DELAY_MS),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    puzzle_epoch: Date,
    utc_offset: UtcOffset,
    filler_value: String,
    report_cache_ttl: Duration,
    storage: StorageSettings,
    sheets: SheetsSettings,
    social: SocialSettings,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults, then apply
    /// environment overrides for secrets.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };
        config.with_overrides(|key| env::var(key).ok().filter(|value| !value.is_empty()))
    }

    /// Apply secret overrides looked up through `lookup` (the process environment in
    /// [`AppConfig::load`]).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(database) = lookup("MONGO_DB") {
            self.storage.database = database;
        }
        if let Some(key) = lookup("SHEETS_API_KEY") {
            self.sheets.api_key = Some(key);
        }
        if let Some(token) = lookup("SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(token);
        }
        if let Some(id) = lookup("SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(name) = lookup("SHEET_NAME") {
            self.sheets.sheet_name = Some(name);
        }
        if let Some(token) = lookup("SOCIAL_BEARER_TOKEN") {
            self.social.bearer_token = Some(token);
        }
        self
    }

    /// Date of puzzle number 0.
    pub fn puzzle_epoch(&self) -> Date {
        self.puzzle_epoch
    }

    /// Fixed offset in which "today" is evaluated.
    pub fn utc_offset(&self) -> UtcOffset {
        self.utc_offset
    }

    /// Value substituted for missing spreadsheet cells.
    pub fn filler_value(&self) -> &str {
        &self.filler_value
    }

    pub fn report_cache_ttl(&self) -> Duration {
        self.report_cache_ttl
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub fn sheets(&self) -> &SheetsSettings {
        &self.sheets
    }

    pub fn social(&self) -> &SocialSettings {
        &self.social
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            puzzle_epoch: DEFAULT_PUZZLE_EPOCH,
            utc_offset: offset_from_hours(DEFAULT_UTC_OFFSET_HOURS),
            filler_value: DEFAULT_FILLER.into(),
            report_cache_ttl: Duration::from_secs(DEFAULT_REPORT_TTL_SECS),
            storage: StorageSettings::default(),
            sheets: SheetsSettings::default(),
            social: SocialSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    puzzle_epoch: Option<Date>,
    utc_offset_hours: Option<i8>,
    filler_value: Option<String>,
    report_cache_ttl_secs: Option<u64>,
    storage: RawStorage,
    sheets: RawSheets,
    social: RawSocial,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorage {
    database: Option<String>,
    connect_attempts: Option<u32>,
    connect_delay_ms: Option<u64>,
    connect_max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSheets {
    spreadsheet_id: Option<String>,
    sheet_name: Option<String>,
    user_range: Option<String>,
    score_range: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSocial {
    base_url: Option<String>,
    request_delay_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let storage_defaults = defaults.storage;
        let sheets_defaults = defaults.sheets;
        let social_defaults = defaults.social;

        Self {
            puzzle_epoch: value.puzzle_epoch.unwrap_or(defaults.puzzle_epoch),
            utc_offset: value
                .utc_offset_hours
                .map(offset_from_hours)
                .unwrap_or(defaults.utc_offset),
            filler_value: value.filler_value.unwrap_or(defaults.filler_value),
            report_cache_ttl: value
                .report_cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.report_cache_ttl),
            storage: StorageSettings {
                database: value.storage.database.unwrap_or(storage_defaults.database),
                connect_attempts: value
                    .storage
                    .connect_attempts
                    .unwrap_or(storage_defaults.connect_attempts)
                    .max(1),
                connect_delay: value
                    .storage
                    .connect_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(storage_defaults.connect_delay),
                connect_max_delay: value
                    .storage
                    .connect_max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(storage_defaults.connect_max_delay),
            },
            sheets: SheetsSettings {
                base_url: value.sheets.base_url.unwrap_or(sheets_defaults.base_url),
                spreadsheet_id: value.sheets.spreadsheet_id,
                sheet_name: value.sheets.sheet_name,
                user_range: value.sheets.user_range.unwrap_or(sheets_defaults.user_range),
                score_range: value
                    .sheets
                    .score_range
                    .unwrap_or(sheets_defaults.score_range),
                api_key: None,
                access_token: None,
            },
            social: SocialSettings {
                base_url: value.social.base_url.unwrap_or(social_defaults.base_url),
                request_delay: value
                    .social
                    .request_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(social_defaults.request_delay),
                bearer_token: None,
            },
        }
    }
}

/// Out-of-range hours fall back to UTC.
fn offset_from_hours(hours: i8) -> UtcOffset {
    UtcOffset::from_hms(hours, 0, 0).unwrap_or_else(|err| {
        warn!(hours, error = %err, "invalid UTC offset; using UTC");
        UtcOffset::UTC
    })
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, offset};

    use super::*;

    #[test]
    fn defaults_follow_the_competition_rules() {
        let config = AppConfig::default();
        assert_eq!(config.puzzle_epoch(), date!(2021 - 06 - 19));
        assert_eq!(config.utc_offset(), offset!(-5));
        assert_eq!(config.filler_value(), "7");
        assert_eq!(config.sheets().score_range, "C2:T1000");
        assert!(config.sheets().access_token.is_none());
    }

    #[test]
    fn partial_files_keep_remaining_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"utc_offset_hours": 2, "filler_value": "", "sheets": {"sheet_name": "Live"}}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.utc_offset(), offset!(+2));
        assert_eq!(config.filler_value(), "");
        assert_eq!(config.sheets().sheet_name.as_deref(), Some("Live"));
        assert_eq!(config.sheets().user_range, "A2:A1000");
        assert_eq!(config.puzzle_epoch(), DEFAULT_PUZZLE_EPOCH);
    }

    #[test]
    fn secrets_come_from_overrides() {
        let config = AppConfig::default().with_overrides(|key| match key {
            "SHEETS_ACCESS_TOKEN" => Some("token".into()),
            "SOCIAL_BEARER_TOKEN" => Some("bearer".into()),
            _ => None,
        });
        assert_eq!(config.sheets().access_token.as_deref(), Some("token"));
        assert_eq!(config.social().bearer_token.as_deref(), Some("bearer"));
        assert!(config.sheets().api_key.is_none());
    }

    #[test]
    fn storage_section_tunes_the_connection_schedule() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"storage": {"database": "golf_test", "connect_attempts": 0, "connect_delay_ms": 50}}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        let storage = config.storage();
        assert_eq!(storage.database, "golf_test");
        assert_eq!(storage.connect_attempts, 1);
        assert_eq!(storage.connect_delay, Duration::from_millis(50));
        assert_eq!(storage.connect_max_delay, Duration::from_secs(3));

        let config = config.with_overrides(|key| (key == "MONGO_DB").then(|| "golf_prod".into()));
        assert_eq!(config.storage().database, "golf_prod");
    }

    #[test]
    fn invalid_offsets_fall_back_to_utc() {
        assert_eq!(offset_from_hours(42), UtcOffset::UTC);
    }
}
