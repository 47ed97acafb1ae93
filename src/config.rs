use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::grade::TierScheme;
use crate::lines_upload::LineColumns;
use crate::merge::MergeConfig;
use crate::state::League;

/// Knobs for the roster adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub parallelism: usize,
    pub page_delay: Duration,
    pub max_pages: usize,
    pub http_timeout: Duration,
    pub balldontlie_api_key: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            parallelism: 6,
            page_delay: Duration::from_millis(200),
            max_pages: 200,
            http_timeout: Duration::from_secs(10),
            balldontlie_api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub league: League,
    pub merge: MergeConfig,
    pub columns: LineColumns,
    pub lines_path: Option<PathBuf>,
    pub scheme: TierScheme,
    pub fetch: FetchOptions,
    /// `None` memoizes fetched rosters for the whole session.
    pub cache_ttl: Option<Duration>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Loads `.env.local` and `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key).and_then(|val| {
                let trimmed = val.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let default_std_dev = match get("EDGE_DEFAULT_STD_DEV") {
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => Some(v),
                _ => return Err(ConfigError::InvalidDefaultStdDev(raw)),
            },
            None => None,
        };

        let league = match get("EDGE_LEAGUE") {
            Some(raw) => League::parse(&raw).ok_or(ConfigError::UnknownLeague(raw))?,
            None => League::Nba,
        };

        let scheme = match get("EDGE_TIER_SCHEME") {
            Some(raw) => TierScheme::parse(&raw).ok_or(ConfigError::UnknownTierScheme(raw))?,
            None => TierScheme::Letter,
        };

        let defaults = FetchOptions::default();
        let fetch = FetchOptions {
            parallelism: get("FETCH_PARALLELISM")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.parallelism)
                .clamp(2, 32),
            page_delay: get("ROSTER_PAGE_DELAY_MS")
                .and_then(|val| val.parse::<u64>().ok())
                .map(|ms| Duration::from_millis(ms.min(5_000)))
                .unwrap_or(defaults.page_delay),
            max_pages: get("ROSTER_MAX_PAGES")
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(defaults.max_pages)
                .clamp(1, 1_000),
            http_timeout: get("HTTP_TIMEOUT_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .map(|secs| Duration::from_secs(secs.clamp(1, 120)))
                .unwrap_or(defaults.http_timeout),
            balldontlie_api_key: get("BALLDONTLIE_API_KEY"),
        };

        Ok(Self {
            league,
            merge: MergeConfig { default_std_dev },
            columns: LineColumns {
                player: get("EDGE_COL_PLAYER"),
                line: get("EDGE_COL_LINE"),
                projection: get("EDGE_COL_PROJECTION"),
                std_dev: get("EDGE_COL_STD_DEV"),
            },
            lines_path: get("EDGE_LINES_CSV").map(PathBuf::from),
            scheme,
            fetch,
            cache_ttl: get("HTTP_CACHE_TTL_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .map(Duration::from_secs),
            log_file: get("EDGE_LOG_FILE").map(PathBuf::from),
        })
    }
}

/// Parses a `--std-dev` style override with the same rule as `EDGE_DEFAULT_STD_DEV`.
pub fn parse_std_dev(raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ConfigError::InvalidDefaultStdDev(raw.to_string())),
    }
}
