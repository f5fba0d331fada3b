//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::spotify::TRACKS_BATCH_LIMIT;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SONG_SLEUTHS_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of tracks returned by a catalog search.
    pub search_limit: u32,
    /// Maximum ids per metadata lookup during reveal.
    pub metadata_batch_size: usize,
    /// Settings for playlists created alongside games.
    pub playlist: PlaylistConfig,
    /// Reveal lease and wait tuning.
    pub reveal: RevealConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Playlist creation settings.
pub struct PlaylistConfig {
    /// Whether created playlists are public.
    pub public: bool,
    /// Prepended to the game name to form the playlist description.
    pub description_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Reveal pipeline timing.
pub struct RevealConfig {
    /// Lifetime of a reveal lease before another caller may take it over. The holder extends
    /// it by one request timeout per catalog call it is about to make.
    pub lease_secs: i64,
    /// How long a caller that lost the lease waits for the winner.
    pub wait: Duration,
    /// Poll interval while waiting.
    pub poll: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    app_config
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

    /// Description given to the playlist of a game called `name`.
    pub fn playlist_description(&self, name: &str) -> String {
        format!("{}{name}", self.playlist.description_prefix)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_limit: 10,
            metadata_batch_size: TRACKS_BATCH_LIMIT,
            playlist: PlaylistConfig {
                public: false,
                description_prefix: "Song Sleuths playlist for ".into(),
            },
            reveal: RevealConfig {
                lease_secs: 30,
                wait: Duration::from_millis(5_000),
                poll: Duration::from_millis(200),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file; every key is optional.
struct RawConfig {
    search_limit: Option<u32>,
    metadata_batch_size: Option<usize>,
    #[serde(default)]
    playlist: RawPlaylist,
    #[serde(default)]
    reveal: RawReveal,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlaylist {
    public: Option<bool>,
    description_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawReveal {
    lease_secs: Option<i64>,
    wait_ms: Option<u64>,
    poll_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            search_limit: value.search_limit.unwrap_or(defaults.search_limit).clamp(1, 50),
            metadata_batch_size: value
                .metadata_batch_size
                .unwrap_or(defaults.metadata_batch_size)
                .clamp(1, TRACKS_BATCH_LIMIT),
            playlist: PlaylistConfig {
                public: value.playlist.public.unwrap_or(defaults.playlist.public),
                description_prefix: value
                    .playlist
                    .description_prefix
                    .unwrap_or(defaults.playlist.description_prefix),
            },
            reveal: RevealConfig {
                lease_secs: value
                    .reveal
                    .lease_secs
                    .filter(|secs| *secs > 0)
                    .unwrap_or(defaults.reveal.lease_secs),
                wait: value
                    .reveal
                    .wait_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.reveal.wait),
                poll: value
                    .reveal
                    .poll_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.reveal.poll),
            },
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"reveal": {"wait_ms": 50}, "search_limit": 5}"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.search_limit, 5);
        assert_eq!(config.reveal.wait, Duration::from_millis(50));
        assert_eq!(config.reveal.lease_secs, 30);
        assert_eq!(config.metadata_batch_size, 50);
        assert!(!config.playlist.public);
    }

    #[test]
    fn batch_size_is_capped_at_catalog_limit() {
        let raw: RawConfig = serde_json::from_str(r#"{"metadata_batch_size": 500}"#).unwrap();
        assert_eq!(AppConfig::from(raw).metadata_batch_size, 50);
    }

    #[test]
    fn playlist_description_uses_prefix() {
        assert_eq!(
            AppConfig::default().playlist_description("Party"),
            "Song Sleuths playlist for Party"
        );
    }
}
