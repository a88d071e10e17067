//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\guess-the-songs\config.toml
//! - macOS: ~/Library/Application Support/guess-the-songs/config.toml
//! - Linux: ~/.config/guess-the-songs/config.toml
//!
//! The config file is human-readable and editable. Settings are
//! loaded at startup and saved when changed through the CLI
//! (`login`/`logout` rewrite the identity section).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::game::resolver::SelectionStrategy;

/// Secondary release-group types excluded from every album search.
///
/// These mark non-canonical editions: a live record or a remix
/// compilation is not the album the player asked to be quizzed on.
pub const DEFAULT_EXCLUDED_SECONDARY_TYPES: &[&str] = &[
    "live",
    "remix",
    "demo",
    "spokenword",
    "dj-mix",
    "interview",
    "audiobook",
    "audio drama",
    "field recording",
];

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote catalog endpoints and credentials
    pub catalog: CatalogConfig,

    /// Game rules
    pub game: GameConfig,

    /// Score database location
    pub database: DatabaseConfig,

    /// Who is playing
    pub identity: IdentityConfig,
}

/// Catalog service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// MusicBrainz WS/2 base URL
    pub musicbrainz_url: String,

    /// TheAudioDB base URL
    pub audiodb_url: String,

    /// TheAudioDB API key; unset disables artist logos
    pub audiodb_api_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            musicbrainz_url: "https://musicbrainz.org/ws/2".to_string(),
            audiodb_url: "https://www.theaudiodb.com/api/v1/json".to_string(),
            audiodb_api_key: None,
        }
    }
}

/// Game rule settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Time limit for a single-album session, in seconds
    pub album_time_limit_secs: u64,

    /// Time limit for a multi-album artist session, in seconds
    pub artist_time_limit_secs: u64,

    /// How to auto-pick among track-count-distinct editions
    pub selection_strategy: SelectionStrategy,

    /// Secondary release-group types excluded from album searches
    pub excluded_secondary_types: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            album_time_limit_secs: 5 * 60,
            artist_time_limit_secs: 20 * 60,
            selection_strategy: SelectionStrategy::default(),
            excluded_secondary_types: DEFAULT_EXCLUDED_SECONDARY_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Score database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path (default: guess_the_songs.db in the data dir)
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// The SQLite URL for this config, defaulting into the data dir.
    pub fn url(&self) -> String {
        match &self.path {
            Some(path) => crate::db::db_url(Some(path)),
            None => {
                let default = data_dir().map(|d| d.join(crate::db::DEFAULT_DB_NAME));
                crate::db::db_url(default.as_deref())
            }
        }
    }
}

/// Identity settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Username scores are saved under; unset means signed out
    pub username: Option<String>,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("guess-the-songs"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Get the data directory path (database, pending-game snapshots)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("guess-the-songs"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    // Ensure directory exists
    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
