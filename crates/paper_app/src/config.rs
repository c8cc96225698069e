//! Optional RON configuration file and base url resolution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use paper_core::{RetryPolicy, TogglePolicy, TrackerConfig};
use paper_engine::{ClientSettings, DEFAULT_BASE_URL};
use paper_logging::paper_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "./paper_insight.ron";
pub const API_URL_ENV: &str = "PAPER_INSIGHT_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TogglePolicySetting {
    #[default]
    Independent,
    Exclusive,
}

impl From<TogglePolicySetting> for TogglePolicy {
    fn from(setting: TogglePolicySetting) -> Self {
        match setting {
            TogglePolicySetting::Independent => TogglePolicy::Independent,
            TogglePolicySetting::Exclusive => TogglePolicy::Exclusive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicySetting {
    #[default]
    Fixed,
    Backoff {
        max_ms: u64,
    },
}

impl From<RetryPolicySetting> for RetryPolicy {
    fn from(setting: RetryPolicySetting) -> Self {
        match setting {
            RetryPolicySetting::Fixed => RetryPolicy::Fixed,
            RetryPolicySetting::Backoff { max_ms } => RetryPolicy::Backoff { max_ms },
        }
    }
}

/// Contents of `paper_insight.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: Option<String>,
    pub toggle_policy: TogglePolicySetting,
    pub max_consecutive_sync_failures: Option<u32>,
    pub retry_policy: RetryPolicySetting,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: None,
            toggle_policy: TogglePolicySetting::default(),
            max_consecutive_sync_failures: None,
            retry_policy: RetryPolicySetting::default(),
            connect_timeout_ms: client.connect_timeout.as_millis() as u64,
            request_timeout_ms: client.request_timeout.as_millis() as u64,
        }
    }
}

impl AppConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        paper_info!("loaded config from {:?}", path);
        Ok(config)
    }
}

/// Everything the binary needs after merging flags, environment and file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub tracker: TrackerConfig,
    pub retry_policy: RetryPolicy,
}

/// Merges the layers; the base url comes from the first non-empty of
/// `--base-url`, `PAPER_INSIGHT_API_URL`, the file, then the default.
pub fn resolve(config: &AppConfig, cli_base_url: Option<&str>, env_base_url: Option<&str>) -> Settings {
    let base_url = [cli_base_url, env_base_url, config.base_url.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string();

    Settings {
        client: ClientSettings {
            base_url,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            ..ClientSettings::default()
        },
        tracker: TrackerConfig {
            toggle_policy: config.toggle_policy.into(),
            max_consecutive_sync_failures: config.max_consecutive_sync_failures,
        },
        retry_policy: config.retry_policy.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper_insight.ron");
        fs::write(
            &path,
            r#"(
                base_url: Some("http://backend:8000/"),
                toggle_policy: Exclusive,
                max_consecutive_sync_failures: Some(5),
                retry_policy: Backoff(max_ms: 30000),
            )"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://backend:8000/"));
        assert_eq!(config.toggle_policy, TogglePolicySetting::Exclusive);
        assert_eq!(config.max_consecutive_sync_failures, Some(5));
        assert_eq!(config.retry_policy, RetryPolicySetting::Backoff { max_ms: 30_000 });
        assert_eq!(config.connect_timeout_ms, 10_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper_insight.ron");
        fs::write(&path, "(toggle_policy: Sideways)").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("paper_insight.ron"));
    }

    #[test]
    fn base_url_precedence() {
        let config = AppConfig {
            base_url: Some("http://file/".into()),
            ..AppConfig::default()
        };

        let settings = resolve(&config, Some("http://flag/"), Some("http://env/"));
        assert_eq!(settings.client.base_url, "http://flag/");

        let settings = resolve(&config, None, Some("http://env/"));
        assert_eq!(settings.client.base_url, "http://env/");

        let settings = resolve(&config, None, Some("  "));
        assert_eq!(settings.client.base_url, "http://file/");

        let settings = resolve(&AppConfig::default(), None, None);
        assert_eq!(settings.client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn policies_map_onto_core_types() {
        let config = AppConfig {
            toggle_policy: TogglePolicySetting::Exclusive,
            retry_policy: RetryPolicySetting::Backoff { max_ms: 9000 },
            max_consecutive_sync_failures: Some(3),
            request_timeout_ms: 1500,
            ..AppConfig::default()
        };
        let settings = resolve(&config, None, None);
        assert_eq!(settings.tracker.toggle_policy, TogglePolicy::Exclusive);
        assert_eq!(settings.tracker.max_consecutive_sync_failures, Some(3));
        assert_eq!(settings.retry_policy, RetryPolicy::Backoff { max_ms: 9000 });
        assert_eq!(settings.client.request_timeout, Duration::from_millis(1500));
    }
}
