//! Configuration loader and validator for the catalog ingestion tools.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::ingest::IngestSettings;
use crate::persist::PersistOptions;
use crate::validate::{FlagDefaults, DEFAULT_HEADER_ROWS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub ingest: Ingest,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Bulk ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Ingest {
    /// Header rows above the first product row, used for row numbers in errors.
    pub header_rows: usize,
    pub placeholder_sku_prefix: String,
    /// Updates in flight at once. 1 runs them strictly in order.
    pub update_concurrency: usize,
    pub max_rename_retries: u32,
    pub defaults: FlagDefaults,
}

impl Default for Ingest {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            placeholder_sku_prefix: "SKU".to_string(),
            update_concurrency: 1,
            max_rename_retries: 2,
            defaults: FlagDefaults::default(),
        }
    }
}

impl App {
    /// Expand a leading `~/` in `data_dir`.
    pub fn resolved_data_dir(&self) -> String {
        match (self.data_dir.strip_prefix("~/"), std::env::var("HOME")) {
            (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
            _ => self.data_dir.clone(),
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.app.resolved_data_dir())
    }

    /// `DATABASE_URL` when set, otherwise a database file under `data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/catalog.db", self.app.resolved_data_dir()))
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            header_rows: self.ingest.header_rows,
            placeholder_prefix: self.ingest.placeholder_sku_prefix.clone(),
            defaults: self.ingest.defaults,
            persist: PersistOptions {
                update_concurrency: self.ingest.update_concurrency,
                max_rename_retries: self.ingest.max_rename_retries,
            },
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    let ing = &cfg.ingest;
    if ing.placeholder_sku_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "ingest.placeholder_sku_prefix must be non-empty",
        ));
    }
    if ing.update_concurrency == 0 {
        return Err(ConfigError::Invalid("ingest.update_concurrency must be > 0"));
    }
    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

ingest:
  header_rows: 1
  placeholder_sku_prefix: "SKU"
  update_concurrency: 1
  max_rename_retries: 2
  defaults:
    is_active: true
    is_featured: false
    free_shipping: false
    returnable: true
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.ingest, Ingest::default());
    }

    #[test]
    fn ingest_section_is_optional() {
        let cfg: Config = serde_yaml::from_str("app:\n  data_dir: ./d\n").unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.ingest.update_concurrency, 1);
        assert!(cfg.ingest.defaults.returnable);
    }

    #[test]
    fn partial_ingest_section_keeps_defaults() {
        let cfg: Config =
            serde_yaml::from_str("app:\n  data_dir: ./d\ningest:\n  header_rows: 3\n").unwrap();
        assert_eq!(cfg.ingest.header_rows, 3);
        assert_eq!(cfg.ingest.placeholder_sku_prefix, "SKU");
    }

    #[test]
    fn invalid_values() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("data_dir")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.ingest.update_concurrency = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.ingest.placeholder_sku_prefix = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn settings_follow_config() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.ingest.update_concurrency = 4;
        cfg.ingest.defaults.is_active = false;
        let settings = cfg.ingest_settings();
        assert_eq!(settings.persist.update_concurrency, 4);
        assert!(!settings.defaults.is_active);
        assert_eq!(settings.placeholder_prefix, "SKU");
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.data_dir, "./data");
    }
}
