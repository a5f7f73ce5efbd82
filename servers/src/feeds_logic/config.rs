use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Parser;
use lib_feeds::configs::{parse_timezone, DEFAULT_TIMEZONE};
use lib_feeds::retrieve::DEFAULT_SHEETS_BASE_URL;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "server_feeds.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Spreadsheet-backed activity dashboard feed server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "FEEDS_PORT", help = "Port to listen on for dashboard requests.")]
    pub port: Option<u16>,

    #[clap(long, env = "FEEDS_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "FEEDS_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "FEEDS_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "FEEDS_REFRESH_MINUTES", help = "Minutes between full refreshes of every source.")]
    pub refresh_minutes: Option<u64>,

    #[clap(long, env = "FEEDS_RETRY_SECONDS", help = "Seconds before a failing source is retried.")]
    pub retry_seconds: Option<u64>,

    #[clap(long, env = "REDIS_URL", help = "Redis URL for the cache snapshot and dashboard extras.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "FEEDS_MEMORY_STORE", help = "Keep the cache snapshot in memory instead of Redis.")]
    pub memory_store: Option<bool>,

    #[clap(long, env = "FEEDS_TIMEZONE", help = "IANA time zone used for hours, days and captions.")]
    pub timezone: Option<String>,

    #[clap(long, env = "INCLUDE_SOLAR", help = "Add solar and server stats from Redis to /all.")]
    pub include_solar: Option<bool>,

    #[clap(long, env = "FEEDS_DEV_CORS", help = "Allow any origin (development front end).")]
    pub dev_cors: Option<bool>,

    #[clap(long, env = "SHEETS_BASE_URL", help = "Spreadsheet values API root.")]
    pub sheets_base_url: Option<String>,

    #[clap(long, env = "SHEETS_API_KEY", help = "API key sent as the `key` query parameter.")]
    pub sheets_api_key: Option<String>,

    #[clap(long, env = "SHEETS_TOKEN", help = "Bearer token for the spreadsheet API.")]
    pub sheets_token: Option<String>,

    #[clap(long, env = "FEEDS_SOURCES_FILE", help = "JSON file listing sources instead of the built-in table.")]
    pub sources_file: Option<PathBuf>,

    #[clap(long, help = "Fetch and process one source, print the summary and exit.")]
    #[serde(skip)]
    pub test_source: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            refresh_minutes: other.refresh_minutes.or(self.refresh_minutes),
            retry_seconds: other.retry_seconds.or(self.retry_seconds),
            redis_url: other.redis_url.or(self.redis_url),
            memory_store: other.memory_store.or(self.memory_store),
            timezone: other.timezone.or(self.timezone),
            include_solar: other.include_solar.or(self.include_solar),
            dev_cors: other.dev_cors.or(self.dev_cors),
            sheets_base_url: other.sheets_base_url.or(self.sheets_base_url),
            sheets_api_key: other.sheets_api_key.or(self.sheets_api_key),
            sheets_token: other.sheets_token.or(self.sheets_token),
            sources_file: other.sources_file.or(self.sources_file),
            test_source: other.test_source.or(self.test_source),
        }
    }

    fn defaults() -> Config {
        Config {
            port: Some(2036),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            refresh_minutes: Some(30),
            retry_seconds: Some(300),
            redis_url: Some("redis://localhost:6379".to_string()),
            memory_store: Some(false),
            timezone: Some(DEFAULT_TIMEZONE.to_string()),
            include_solar: Some(false),
            dev_cors: Some(false),
            sheets_base_url: Some(DEFAULT_SHEETS_BASE_URL.to_string()),
            ..Default::default()
        }
    }

    /// Checks values and fills the concrete settings the server runs with.
    pub fn resolve(self) -> Result<Settings> {
        let defaults = Config::defaults();
        let c = defaults.merge(self);

        let timezone = c.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        let tz = parse_timezone(timezone)?;

        let refresh_minutes = c.refresh_minutes.unwrap_or(30);
        let retry_seconds = c.retry_seconds.unwrap_or(300);
        anyhow::ensure!(refresh_minutes > 0, "refresh interval must be at least one minute");
        anyhow::ensure!(retry_seconds > 0, "retry delay must be at least one second");

        Ok(Settings {
            port: c.port.unwrap_or(2036),
            log_dir: c.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: c.log_level.unwrap_or_else(|| "info".to_string()),
            refresh_period: Duration::from_secs(refresh_minutes * 60),
            retry_delay: Duration::from_secs(retry_seconds),
            redis_url: if c.memory_store.unwrap_or(false) { None } else { c.redis_url },
            tz,
            include_solar: c.include_solar.unwrap_or(false),
            dev_cors: c.dev_cors.unwrap_or(false),
            sheets_base_url: c.sheets_base_url.unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
            sheets_api_key: c.sheets_api_key.filter(|k| !k.is_empty()),
            sheets_token: c.sheets_token.filter(|t| !t.is_empty()),
            sources_file: c.sources_file,
            test_source: c.test_source,
        })
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub refresh_period: Duration,
    pub retry_delay: Duration,
    /// `None` keeps the snapshot in memory.
    pub redis_url: Option<String>,
    pub tz: Tz,
    pub include_solar: bool,
    pub dev_cors: bool,
    pub sheets_base_url: String,
    pub sheets_api_key: Option<String>,
    pub sheets_token: Option<String>,
    pub sources_file: Option<PathBuf>,
    pub test_source: Option<String>,
}

/// Defaults, then the JSON config file, then environment and CLI.
pub fn load_config() -> Result<Config> {
    let cli = Config::parse();
    merge_sources(cli)
}

fn merge_sources(cli: Config) -> Result<Config> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path, cli.config_path.is_some())? {
        current = current.merge(file_config);
    }
    Ok(current.merge(cli))
}

/// A missing default file is fine; a missing file that was asked for is not.
/// A file that exists but does not parse is always an error.
fn read_config_file(path: &Path, explicit: bool) -> Result<Option<Config>> {
    if !path.exists() {
        anyhow::ensure!(!explicit, "config file {} does not exist", path.display());
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    let config = serde_json::from_str::<Config>(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(Some(config))
}
