use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Open-Meteo endpoints and request tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Connection/request timeout applied by the HTTP client.
    pub timeout_seconds: u64,
    /// Language used for geocoded place names.
    pub language: String,
    pub forecast_days: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace. `RUST_LOG` takes precedence.
    pub level: String,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [upstream]
/// timeout_seconds = 5
///
/// [server]
/// bind = "127.0.0.1:8000"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_seconds: 10,
            language: "en".to_string(),
            forecast_days: 7,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Load config from the platform config directory, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-api", "weather-api")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("geocoding_url", &self.upstream.geocoding_url),
            ("forecast_url", &self.upstream.forecast_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("upstream.{name} must be an http(s) URL, got '{url}'");
            }
        }

        if !(1..=300).contains(&self.upstream.timeout_seconds) {
            bail!(
                "upstream.timeout_seconds must be between 1 and 300, got {}",
                self.upstream.timeout_seconds
            );
        }

        // Open-Meteo serves at most 16 forecast days.
        if !(1..=16).contains(&self.upstream.forecast_days) {
            bail!(
                "upstream.forecast_days must be between 1 and 16, got {}",
                self.upstream.forecast_days
            );
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_open_meteo() {
        let cfg = Config::default();
        assert_eq!(
            cfg.upstream.geocoding_url,
            "https://geocoding-api.open-meteo.com/v1/search"
        );
        assert_eq!(cfg.upstream.forecast_url, "https://api.open-meteo.com/v1/forecast");
        assert_eq!(cfg.upstream.forecast_days, 7);
        assert_eq!(cfg.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.server.bind, "0.0.0.0:8000");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[upstream]\ntimeout_seconds = 3\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.upstream.timeout_seconds, 3);
        assert_eq!(cfg.upstream.language, "en");
        assert_eq!(cfg.server, ServerConfig::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.server.bind = "127.0.0.1:9000".into();
        cfg.logging.level = "debug".into();
        cfg.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let mut cfg = Config::default();
        cfg.upstream.timeout_seconds = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut cfg = Config::default();
        cfg.upstream.forecast_url = "ftp://example.com".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("forecast_url"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[upstream]\nforecast_days = 40\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("forecast_days"));
    }
}
