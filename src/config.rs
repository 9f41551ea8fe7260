use std::env;
use std::path::PathBuf;

use log::LevelFilter;

pub const DEFAULT_DB_PATH: &str = "jugadoras.db";
pub const DEFAULT_ROSTER_URL: &str =
    "https://github.com/RobertoRicobaldi/SQLite123RFEF/raw/main/Jugadoras_123Total13marzo2025.xlsx";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub db_path: PathBuf,
    pub roster_url: String,
    pub crests_url: Option<String>,
    pub http_timeout_secs: u64,
    pub log_level: LevelFilter,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            roster_url: DEFAULT_ROSTER_URL.to_string(),
            crests_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            log_level: LevelFilter::Info,
        }
    }
}

impl ScoutConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let db_path = get("SCOUT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let roster_url = get("SCOUT_ROSTER_URL").unwrap_or(defaults.roster_url);
        let crests_url = get("SCOUT_CRESTS_URL").or(defaults.crests_url);
        let http_timeout_secs = get("SCOUT_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
            .clamp(1, 120);
        let log_level = get("SCOUT_LOG")
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(defaults.log_level);

        Self {
            db_path,
            roster_url,
            crests_url,
            http_timeout_secs,
            log_level,
        }
    }
}
