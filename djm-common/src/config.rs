//! Settings file resolution and loading
//!
//! Settings path resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/djm/config.toml`), if the file exists
//! 4. No file - callers fall back to compiled defaults

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV_VAR: &str = "DJM_CONFIG";

/// Logging section of the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level directive (overridden by `RUST_LOG`)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the settings file path
///
/// Returns `None` when no tier names a file; the default location only
/// counts when the file is actually present.
pub fn resolve_settings_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_settings_path().filter(|p| p.exists())
}

/// Platform default settings location
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("djm").join("config.toml"))
}

/// Read and deserialize a TOML file
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "Settings file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded settings file");
    Ok(parsed)
}

/// Read and deserialize a JSON file
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::NotFound(format!("File not found: {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        logging: LoggingConfig,
        preset: Option<String>,
    }

    #[test]
    #[serial]
    fn cli_argument_wins_over_environment() {
        std::env::set_var("DJM_TEST_CONFIG_A", "/from/env.toml");
        let resolved = resolve_settings_path(Some(Path::new("/from/cli.toml")), "DJM_TEST_CONFIG_A");
        std::env::remove_var("DJM_TEST_CONFIG_A");

        assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
    }

    #[test]
    #[serial]
    fn environment_used_without_cli_argument() {
        std::env::set_var("DJM_TEST_CONFIG_B", "/from/env.toml");
        let resolved = resolve_settings_path(None, "DJM_TEST_CONFIG_B");
        std::env::remove_var("DJM_TEST_CONFIG_B");

        assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
    }

    #[test]
    #[serial]
    fn blank_environment_value_ignored() {
        std::env::set_var("DJM_TEST_CONFIG_C", "   ");
        let resolved = resolve_settings_path(None, "DJM_TEST_CONFIG_C");
        std::env::remove_var("DJM_TEST_CONFIG_C");

        // Falls through to the platform default, which only counts if present
        if let Some(path) = resolved {
            assert!(path.exists());
        }
    }

    #[test]
    fn load_toml_file_parses_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "preset = \"fast\"\n\n[logging]\nlevel = \"debug\"\n").unwrap();

        let sample: Sample = load_toml_file(&path).unwrap();
        assert_eq!(sample.preset.as_deref(), Some("fast"));
        assert_eq!(sample.logging.level, "debug");
    }

    #[test]
    fn load_toml_file_defaults_logging() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let sample: Sample = load_toml_file(&path).unwrap();
        assert_eq!(sample.logging, LoggingConfig::default());
        assert!(sample.preset.is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_toml_file::<Sample>(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn malformed_toml_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "preset = [unclosed").unwrap();

        let err = load_toml_file::<Sample>(&path).unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn load_json_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let values: Vec<u32> = load_json_file(&path).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
