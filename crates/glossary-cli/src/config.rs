//! CLI configuration (`glossary.toml`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use glossary_catalog::RetryPolicy;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "glossary.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlossaryConfig {
    /// Directory holding the write-ahead log, snapshot and diagnostics.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is not set (e.g. "info", "glossary_catalog=debug").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Run a resolution pass after every import.
    #[serde(default = "default_auto_resolve")]
    pub auto_resolve: bool,

    /// Storage commit retries.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./glossary-data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_resolve() -> bool {
    true
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            auto_resolve: default_auto_resolve(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GlossaryConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// `explicit` if given, else `./glossary.toml` when it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: GlossaryConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlossaryConfig::default());
        assert!(config.auto_resolve);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_partial_retry_table() {
        let config: GlossaryConfig = toml::from_str(
            r#"
            data_dir = "/var/lib/glossary"
            auto_resolve = false

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/glossary"));
        assert!(!config.auto_resolve);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 50);
    }

    #[test]
    fn test_from_file_reports_path_on_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glossary.toml");
        std::fs::write(&path, "auto_resolve = \"sometimes\"").unwrap();

        let err = GlossaryConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("glossary.toml"));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(GlossaryConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
