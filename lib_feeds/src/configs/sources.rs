use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::processors::{processor_for, SourceProcessor, KNOWN_KINDS};
use crate::retrieve::SourceLocation;

pub const DEFAULT_TIMEZONE: &str = "Europe/London";

const DEFAULT_RANGE: &str = "Sheet1!A1:Z";

/// Built-in table: source key, range, processor kind.
const BUILTIN_SOURCES: &[(&str, &str, &str)] = &[
    ("pullups", DEFAULT_RANGE, "pullups"),
    ("k5", DEFAULT_RANGE, "five_k"),
    ("parkrun", DEFAULT_RANGE, "parkrun"),
    ("driving", DEFAULT_RANGE, "driving"),
    ("spotify", DEFAULT_RANGE, "spotify"),
    ("chess", DEFAULT_RANGE, "chess"),
    ("duolingo", DEFAULT_RANGE, "duolingo"),
    ("climbing", "DetailedRoutes!A1:Z", "climbing"),
    ("COD", "AllGames!A1:Z", "cod"),
    ("dobble", "60!A1:Z", "dobble"),
    ("typing", DEFAULT_RANGE, "typing"),
    ("pushups", DEFAULT_RANGE, "pushups"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source '{key}' names unknown processor '{kind}' (known: {known})", known = KNOWN_KINDS.join(", "))]
    UnknownProcessor { key: String, kind: String },

    #[error("unknown time zone '{0}'")]
    InvalidTimezone(String),

    #[error("failed to read sources file {path}: {source}")]
    SourcesFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file {path}: {source}")]
    SourcesFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("source key '{0}' is configured more than once")]
    DuplicateKey(String),
}

/// One tracked source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Cache key, e.g. `chess` or `COD`.
    pub key: String,
    #[serde(flatten)]
    pub location: SourceLocation,
    /// Registry kind of the processor that summarises this source.
    pub processor: String,
}

impl SourceConfig {
    pub fn new(key: impl Into<String>, location: SourceLocation, processor: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location,
            processor: processor.into(),
        }
    }

    /// Name of the environment variable holding this key's spreadsheet id.
    pub fn env_var(key: &str) -> String {
        format!("{}_SPREADSHEET_ID", key.to_uppercase())
    }

    /// Resolves the processor through the registry.
    pub fn resolve_processor(&self) -> Result<Arc<dyn SourceProcessor>, ConfigError> {
        processor_for(&self.processor).ok_or_else(|| ConfigError::UnknownProcessor {
            key: self.key.clone(),
            kind: self.processor.clone(),
        })
    }
}

impl fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} @ {})", self.key, self.processor, self.location.range)
    }
}

/// The built-in source table. Spreadsheet ids come from `lookup`, normally
/// `std::env::var`; keys without an id are skipped with a warning.
pub fn default_sources(lookup: impl Fn(&str) -> Option<String>) -> Vec<SourceConfig> {
    BUILTIN_SOURCES
        .iter()
        .filter_map(|&(key, range, kind)| {
            let var = SourceConfig::env_var(key);
            match lookup(&var).filter(|id| !id.trim().is_empty()) {
                Some(id) => Some(SourceConfig::new(key, SourceLocation::new(id.trim(), range), kind)),
                None => {
                    tracing::warn!(source_key = key, env_var = %var, "No spreadsheet id configured; skipping source");
                    None
                }
            }
        })
        .collect()
}

/// Reads a JSON array of sources and checks every processor kind and key.
///
/// ```json
/// [{"key": "chess", "spreadsheetId": "...", "range": "Sheet1!A1:Z", "processor": "chess"}]
/// ```
pub fn load_sources_file(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SourcesFile {
        path: path.to_path_buf(),
        source,
    })?;
    let sources: Vec<SourceConfig> = serde_json::from_str(&raw).map_err(|source| ConfigError::SourcesFormat {
        path: path.to_path_buf(),
        source,
    })?;
    validate_sources(&sources)?;
    Ok(sources)
}

/// Rejects duplicate keys and unknown processor kinds.
pub fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for source in sources {
        if !seen.insert(source.key.as_str()) {
            return Err(ConfigError::DuplicateKey(source.key.clone()));
        }
        source.resolve_processor()?;
    }
    Ok(())
}

/// Parses an IANA zone name such as `Europe/London`.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}
