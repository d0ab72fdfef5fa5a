//! Runtime configuration
//!
//! All tunables live in one immutable [`Config`], built once from the command
//! line and handed to the providers and the poll loop at construction.

use directories::BaseDirs;
use reqwest::Url;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::classify::ThresholdTable;
use crate::cli::Cli;

/// Default geolocation endpoint (IP based, no parameters)
pub const DEFAULT_GEO_URL: &str = "https://ipapi.co/json/";

/// Default current-weather endpoint
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Name of the state directory under `$HOME`
const BASE_DIR_NAME: &str = ".i3geoweather";

/// Errors that prevent building a usable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory to place the state directory in
    #[error("could not determine the home directory; pass --base-dir")]
    NoHomeDir,

    /// The weather service needs an API key
    #[error("no weather API key; pass --api-key or set OPENWEATHER_API_KEY")]
    MissingApiKey,

    /// An endpoint URL did not parse
    #[error("invalid {name} URL '{url}': {reason}")]
    InvalidUrl {
        name: &'static str,
        url: String,
        reason: String,
    },

    /// The state directory could not be created
    #[error("could not create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Immutable runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding caches, output, log and PID file
    pub base_dir: PathBuf,
    /// Geolocation service endpoint
    pub geo_url: String,
    /// Weather service endpoint
    pub weather_url: String,
    /// Weather service API key (`appid`)
    pub api_key: Option<String>,
    /// Maximum age of a reusable location record
    pub location_window: Duration,
    /// Maximum age of a reusable weather record
    pub weather_window: Duration,
    /// Delay after a published cycle
    pub success_delay: Duration,
    /// Delay after a cycle with no reading
    pub failure_delay: Duration,
    /// Upper bound on every HTTP request
    pub http_timeout: Duration,
    /// Temperature bands for the status icon
    pub thresholds: ThresholdTable,
}

impl Config {
    /// Configuration with default endpoints and intervals rooted at `base_dir`
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            geo_url: DEFAULT_GEO_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            api_key: None,
            location_window: Duration::from_secs(3 * 3600),
            weather_window: Duration::from_secs(3600),
            success_delay: Duration::from_secs(300),
            failure_delay: Duration::from_secs(60),
            http_timeout: Duration::from_secs(10),
            thresholds: ThresholdTable::default(),
        }
    }

    /// Builds the configuration from parsed arguments
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let base_dir = match &cli.base_dir {
            Some(dir) => dir.clone(),
            None => default_base_dir()?,
        };

        let mut config = Self::new(base_dir);
        if let Some(url) = &cli.geo_url {
            config.geo_url = url.clone();
        }
        if let Some(url) = &cli.weather_url {
            config.weather_url = url.clone();
        }
        config.api_key = cli.api_key.clone().filter(|key| !key.trim().is_empty());

        validate_url("geolocation", &config.geo_url)?;
        validate_url("weather", &config.weather_url)?;
        Ok(config)
    }

    /// The API key, or an error when none was configured
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }

    /// Creates the base directory if it does not exist
    pub fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.base_dir).map_err(|source| ConfigError::Io {
            path: self.base_dir.clone(),
            source,
        })
    }

    /// File the status line is published to
    pub fn output_path(&self) -> PathBuf {
        self.base_dir.join("i3geoweather.txt")
    }

    /// Single-instance lock file
    pub fn pid_path(&self) -> PathBuf {
        self.base_dir.join("i3geoweather.pid")
    }

    /// Log file written by the running instance
    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join("i3geoweather.log")
    }
}

fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
    Ok(dirs.home_dir().join(BASE_DIR_NAME))
}

fn validate_url(name: &'static str, url: &str) -> Result<(), ConfigError> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl {
            name,
            url: url.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/state"));
        assert_eq!(config.location_window, Duration::from_secs(10800));
        assert_eq!(config.weather_window, Duration::from_secs(3600));
        assert_eq!(config.success_delay, Duration::from_secs(300));
        assert_eq!(config.failure_delay, Duration::from_secs(60));
        assert!(config.http_timeout > Duration::ZERO);
        assert_eq!(config.geo_url, DEFAULT_GEO_URL);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_derived_paths_live_in_base_dir() {
        let config = Config::new(PathBuf::from("/tmp/state"));
        assert_eq!(config.output_path(), PathBuf::from("/tmp/state/i3geoweather.txt"));
        assert_eq!(config.pid_path(), PathBuf::from("/tmp/state/i3geoweather.pid"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/state/i3geoweather.log"));
    }

    #[test]
    fn test_from_cli_applies_overrides() {
        let cli = Cli::parse_from([
            "i3geoweather",
            "--base-dir",
            "/tmp/elsewhere",
            "--api-key",
            "secret",
            "--weather-url",
            "http://127.0.0.1:9000/weather",
        ]);
        let config = Config::from_cli(&cli).expect("valid config");
        assert_eq!(config.base_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.require_api_key().ok(), Some("secret"));
        assert_eq!(config.weather_url, "http://127.0.0.1:9000/weather");
        assert_eq!(config.geo_url, DEFAULT_GEO_URL);
    }

    #[test]
    fn test_from_cli_rejects_bad_url() {
        let cli = Cli::parse_from(["i3geoweather", "--base-dir", "/tmp/x", "--geo-url", "not a url"]);
        let result = Config::from_cli(&cli);
        assert!(matches!(result, Err(ConfigError::InvalidUrl { name: "geolocation", .. })));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let cli = Cli::parse_from(["i3geoweather", "--base-dir", "/tmp/x", "--api-key", "  "]);
        let config = Config::from_cli(&cli).expect("valid config");
        assert!(matches!(config.require_api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_ensure_base_dir_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::new(temp_dir.path().join("state"));
        config.ensure_base_dir().expect("should create");
        assert!(config.base_dir.is_dir());
    }
}
