use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_RECONCILE_DELAY_MS: u64 = 1000;

/// How competing document fetch results are resolved.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentOrdering {
    /// Apply a fetch only if it was issued after the write currently shown.
    #[default]
    IssueOrder,
    /// Apply every successful fetch; whichever resolves last wins.
    CompletionOrder,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub server_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub reconcile_delay_ms: Option<u64>,
    pub document_ordering: Option<DocumentOrdering>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub reconcile_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reconcile_delay: Duration::from_millis(DEFAULT_RECONCILE_DELAY_MS),
        }
    }
}

/// Effective settings after merging the config file with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub timing: Timing,
    pub ordering: DocumentOrdering,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        let server_url = self
            .server_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
            .to_string();

        Settings {
            server_url,
            timing: Timing {
                poll_interval: positive_millis(self.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS),
                reconcile_delay: positive_millis(
                    self.reconcile_delay_ms,
                    DEFAULT_RECONCILE_DELAY_MS,
                ),
            },
            ordering: self.document_ordering.unwrap_or_default(),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("drafter").join("config.json"))
    }
}

fn positive_millis(value: Option<u64>, default: u64) -> Duration {
    match value {
        Some(ms) if ms > 0 => Duration::from_millis(ms),
        Some(_) => {
            tracing::warn!("Ignoring zero interval in config, using {}ms", default);
            Duration::from_millis(default)
        }
        None => Duration::from_millis(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());

        let settings = config.settings();
        assert_eq!(settings.server_url, "http://localhost:5000");
        assert_eq!(settings.timing, Timing::default());
        assert_eq!(settings.ordering, DocumentOrdering::IssueOrder);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafter").join("config.json");
        let config = Config {
            server_url: Some("http://10.0.0.2:5000/".into()),
            poll_interval_ms: Some(500),
            document_ordering: Some(DocumentOrdering::CompletionOrder),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let settings = loaded.settings();
        assert_eq!(settings.server_url, "http://10.0.0.2:5000");
        assert_eq!(settings.timing.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.timing.reconcile_delay, Duration::from_millis(1000));
        assert_eq!(settings.ordering, DocumentOrdering::CompletionOrder);
    }

    #[test]
    fn test_ordering_uses_kebab_case() {
        let config: Config =
            serde_json::from_str(r#"{"document_ordering": "completion-order"}"#).unwrap();
        assert_eq!(config.document_ordering, Some(DocumentOrdering::CompletionOrder));
    }

    #[test]
    fn test_zero_intervals_fall_back() {
        let config = Config {
            poll_interval_ms: Some(0),
            reconcile_delay_ms: Some(0),
            ..Config::new()
        };
        assert_eq!(config.settings().timing, Timing::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
