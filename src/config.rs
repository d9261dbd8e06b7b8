//! Application-level configuration loading: collection names and the
//! leaderboard row limit.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the shell looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ALPHAMAC_LIVE_CONFIG_PATH";

const DEFAULT_USERS_COLLECTION: &str = "users";
const DEFAULT_SCORES_COLLECTION: &str = "game-scores";
/// Fixed audience of the leaderboard view.
const DEFAULT_LEADERBOARD_LIMIT: usize = 25;

/// Immutable runtime configuration shared across the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Collection holding one profile document per account.
    pub users_collection: String,
    /// Collection holding one document per completed game.
    pub scores_collection: String,
    /// Maximum number of leaderboard rows per delivery.
    pub leaderboard_limit: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded shell configuration");
                    config
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
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users_collection: DEFAULT_USERS_COLLECTION.into(),
            scores_collection: DEFAULT_SCORES_COLLECTION.into(),
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }
}

/// JSON representation of the configuration file; every field is optional.
#[derive(Debug, Deserialize)]
struct RawConfig {
    users_collection: Option<String>,
    scores_collection: Option<String>,
    leaderboard_limit: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            users_collection: raw.users_collection.unwrap_or(defaults.users_collection),
            scores_collection: raw.scores_collection.unwrap_or(defaults.scores_collection),
            leaderboard_limit: raw.leaderboard_limit.unwrap_or(defaults.leaderboard_limit),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
