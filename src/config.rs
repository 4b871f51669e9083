use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::score::Weight;
use crate::select::{ParamError, ViewParams};

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional and may be partial.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the movie statistics API.
    pub api_base_url: String,
    /// Initial IMDb weight (0.0 to 1.0).
    pub weight: f64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub cache: CacheConfig,
    /// Initial view thresholds.
    pub views: ViewsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: crate::DEFAULT_API_BASE_URL.to_string(),
            weight: Weight::DEFAULT,
            timeout_secs: 10,
            cache: CacheConfig::default(),
            views: ViewsConfig::default(),
        }
    }
}

/// On-disk response cache settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Minutes before a cached response is fetched again.
    pub ttl_minutes: i64,
    /// Custom cache database path (overrides XDG default).
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 60,
            path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub top_countries: u32,
    pub min_actor_movies: u32,
    pub min_director_movies: u32,
    pub min_genre_movies: u32,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        let p = ViewParams::default();
        Self {
            top_countries: p.top_countries,
            min_actor_movies: p.min_actor_movies,
            min_director_movies: p.min_director_movies,
            min_genre_movies: p.min_genre_movies,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamOverrides {
    pub weight: Option<f64>,
    pub top_countries: Option<u32>,
    pub min_actor_movies: Option<u32>,
    pub min_director_movies: Option<u32>,
    pub min_genre_movies: Option<u32>,
}

impl AppConfig {
    /// Load config from `~/.config/greenlight/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.ttl_minutes.max(0))
    }

    /// Initial controls: each override wins over the file value, and only the
    /// merged result is checked against the slider ranges.
    pub fn view_params(&self, overrides: &ParamOverrides) -> Result<ViewParams, ParamError> {
        let v = &self.views;
        ViewParams {
            weight: Weight::new(overrides.weight.unwrap_or(self.weight))?,
            top_countries: overrides.top_countries.unwrap_or(v.top_countries),
            min_actor_movies: overrides.min_actor_movies.unwrap_or(v.min_actor_movies),
            min_director_movies: overrides.min_director_movies.unwrap_or(v.min_director_movies),
            min_genre_movies: overrides.min_genre_movies.unwrap_or(v.min_genre_movies),
        }
        .validate()
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default cache database path using XDG cache directory.
pub fn default_cache_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let cache_dir = dirs.cache_dir();
        std::fs::create_dir_all(cache_dir).ok();
        cache_dir.join("responses.db")
    } else {
        // Fallback: current directory
        PathBuf::from("greenlight-cache.db")
    }
}
