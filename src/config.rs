use std::env;
use std::path::PathBuf;

use tracing::Level;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_STATE_DIR: &str = "data/state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Process settings, read once from `LEDGER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind: String,
    pub state_dir: PathBuf,
    pub catalog: Option<PathBuf>,
    pub log_level: Level,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            catalog: None,
            log_level: Level::WARN,
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset; unparseable log settings keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            bind: get("LEDGER_BIND").unwrap_or(defaults.bind),
            state_dir: get("LEDGER_STATE_DIR").map(PathBuf::from).unwrap_or(defaults.state_dir),
            catalog: get("LEDGER_CATALOG").map(PathBuf::from),
            log_level: get("LEDGER_LOG")
                .and_then(|v| v.parse::<Level>().ok())
                .unwrap_or(defaults.log_level),
            log_format: match get("LEDGER_LOG_FORMAT").as_deref() {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => defaults.log_format,
            },
        }
    }
}
