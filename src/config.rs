// Runtime settings shared by the CLI and the API server
//
// Resolution order: built-in defaults, then an optional JSON file
// (FREELANCER_KIT_CONFIG), then individual environment variables.

use crate::error::KitError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG: &str = "FREELANCER_KIT_CONFIG";
pub const ENV_DB: &str = "FREELANCER_KIT_DB";
pub const ENV_USER: &str = "FREELANCER_KIT_USER";
pub const ENV_OUTPUT: &str = "FREELANCER_KIT_OUTPUT";
pub const ENV_LOG: &str = "FREELANCER_KIT_LOG";
pub const ENV_ADDR: &str = "FREELANCER_KIT_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding profiles, counters and document history
    pub db_path: PathBuf,
    /// Whose history the CLI reads and writes
    pub user_id: String,
    /// Where generated printable pages are written
    pub output_dir: PathBuf,
    /// trace, debug, info, warn or error
    pub log_level: String,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("freelancer-kit.db"),
            user_id: "local".to_string(),
            output_dir: PathBuf::from("documents"),
            log_level: "info".to_string(),
            server_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let settings: Settings =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(settings)
    }

    /// Defaults, config file and environment, in that order
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Settings::resolve(&vars)
    }

    /// Same as `load` but reading variables from a map
    pub fn resolve(vars: &HashMap<String, String>) -> Result<Self> {
        let mut settings = match vars.get(ENV_CONFIG) {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };

        settings.apply_overrides(vars);
        settings.validate()?;

        Ok(settings)
    }

    fn apply_overrides(&mut self, vars: &HashMap<String, String>) {
        if let Some(db) = vars.get(ENV_DB) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(user) = vars.get(ENV_USER) {
            self.user_id = user.clone();
        }
        if let Some(output) = vars.get(ENV_OUTPUT) {
            self.output_dir = PathBuf::from(output);
        }
        if let Some(level) = vars.get(ENV_LOG) {
            self.log_level = level.clone();
        }
        if let Some(addr) = vars.get(ENV_ADDR) {
            self.server_addr = addr.clone();
        }
    }

    fn validate(&self) -> Result<(), KitError> {
        if self.user_id.trim().is_empty() {
            return Err(KitError::Config("user_id must not be empty".to_string()));
        }
        self.tracing_level()?;
        Ok(())
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, KitError> {
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| KitError::Config(format!("invalid log level: {}", self.log_level)))
    }

    /// Install the global fmt subscriber at the configured level
    pub fn init_logging(&self) -> Result<()> {
        let level = self.tracing_level()?;
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = Settings::resolve(&HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.tracing_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::resolve(&vars(&[
            (ENV_DB, "/tmp/kit.db"),
            (ENV_USER, "ana"),
            (ENV_LOG, "debug"),
        ]))
        .unwrap();

        assert_eq!(settings.db_path, PathBuf::from("/tmp/kit.db"));
        assert_eq!(settings.user_id, "ana");
        assert_eq!(settings.tracing_level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(settings.output_dir, PathBuf::from("documents"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::resolve(&vars(&[(ENV_LOG, "loud")])).is_err());
        assert!(Settings::resolve(&vars(&[(ENV_USER, "  ")])).is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"user_id": "bia"}"#).unwrap();
        assert_eq!(settings.user_id, "bia");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = Settings::resolve(&vars(&[(ENV_CONFIG, "/nonexistent/kit.json")]));
        assert!(result.is_err());
    }
}
