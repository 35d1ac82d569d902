// src/config/loader.rs
//! Layered configuration loader
//!
//! Layers, lowest precedence first: built-in defaults, TOML files, then
//! `ECG_REPLAY_<SECTION>__<KEY>` environment variables. CLI flags are applied
//! by the binary on top of the returned value.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::constants::{env as env_consts, paths};
use crate::config::ReplayConfig;
use crate::utils::validation::ValidationError;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Configuration validation errors: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("IO error: {0}")]
    Io(String),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("\n  {}", e))
        .collect::<String>()
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Configuration loader merging files and environment over defaults
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    /// Explicit paths must exist; discovered ones are optional
    required: bool,
    env_overrides: bool,
}

impl ConfigLoader {
    /// Loader over the discovered default locations
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            required: false,
            env_overrides: true,
        }
    }

    /// Loader over one explicit file which must exist
    pub fn with_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_paths: vec![path.into()],
            required: true,
            env_overrides: true,
        }
    }

    /// Loader over custom optional paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            required: false,
            env_overrides: true,
        }
    }

    /// Disable `ECG_REPLAY_*` environment overrides
    pub fn without_env(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> Result<ReplayConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Load and merge without validation, for callers that apply further overrides
    pub fn load_unvalidated(&self) -> Result<ReplayConfig, ConfigError> {
        let mut merged = toml::Value::try_from(ReplayConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                if self.required {
                    return Err(ConfigError::FileNotFound(config_path.display().to_string()));
                }
                continue;
            }

            let file_config = Self::load_config_file(config_path)?;
            info!("Loaded configuration from {}", config_path.display());
            merge_toml_values(&mut merged, file_config);
        }

        if self.env_overrides {
            apply_environment_overrides(&mut merged, std::env::vars());
        }

        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("Failed to deserialize config: {}", e)))
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;
        Ok(config)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join(paths::USER_CONFIG_FILE));
        }

        // Local file wins over the user file
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Apply `ECG_REPLAY_SECTION__KEY=value` pairs onto the merged table
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(env_consts::PREFIX) else {
            continue;
        };

        let path: Vec<String> = stripped
            .split(env_consts::SECTION_SEPARATOR)
            .map(str::to_lowercase)
            .collect();

        if path.iter().any(String::is_empty) {
            debug!("Ignoring malformed override {}", key);
            continue;
        }

        debug!("Applying environment override {}", key);
        set_nested_value(config, &path, parse_env_value(&value));
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}

// Cross-platform directory discovery
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlaybackMode;
    use crate::source::LabelFilter;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_discovers_local_file() {
        let loader = ConfigLoader::new();
        assert!(loader
            .config_paths()
            .iter()
            .any(|p| p.ends_with(paths::LOCAL_CONFIG_FILE)));
    }

    #[test]
    fn test_missing_optional_files_yield_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/ecg-replay.toml")])
            .without_env();
        let config = loader.load().unwrap();
        assert_eq!(config, ReplayConfig::default());
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let loader = ConfigLoader::with_file("/nonexistent/ecg-replay.toml").without_env();
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[channel]
target = "/dev/ttyUSB3"

[stream]
sample_rate_hz = 250.0
playback = "continuous"

[dataset]
labels = [0, 1, 2]
slice_start = 100
"#
        )
        .unwrap();

        let config = ConfigLoader::with_file(temp_file.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.channel.target, "/dev/ttyUSB3");
        assert_eq!(config.channel.baud_rate, 115_200);
        assert_eq!(config.stream.sample_rate_hz, 250.0);
        assert_eq!(config.stream.playback, PlaybackMode::Continuous);
        assert_eq!(config.dataset.labels, LabelFilter::classes([0, 1, 2]));
        assert_eq!(config.dataset.slice_start, 100);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[stream]
sample_rate_hz = 0.0
"#
        )
        .unwrap();

        assert!(matches!(
            ConfigLoader::with_file(temp_file.path()).without_env().load(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[stream\nsample_rate_hz = ").unwrap();

        assert!(matches!(
            ConfigLoader::with_file(temp_file.path()).without_env().load(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_environment_pairs_override_nested_keys() {
        let mut merged = toml::Value::try_from(ReplayConfig::default()).unwrap();
        apply_environment_overrides(
            &mut merged,
            vec![
                ("ECG_REPLAY_STREAM__SAMPLE_RATE_HZ".to_string(), "360".to_string()),
                ("ECG_REPLAY_CHANNEL__TARGET".to_string(), "sim".to_string()),
                ("ECG_REPLAY_DATASET__SYNTHETIC_FALLBACK".to_string(), "false".to_string()),
                ("ECG_REPLAY___BROKEN".to_string(), "1".to_string()),
                ("UNRELATED".to_string(), "1".to_string()),
            ],
        );

        let config: ReplayConfig = merged.try_into().unwrap();
        assert_eq!(config.stream.sample_rate_hz, 360.0);
        assert_eq!(config.channel.target, "sim");
        assert!(!config.dataset.synthetic_fallback);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("ECG_REPLAY_STREAM__BEAT_PAUSE_MS", "500");
        }

        let config = ConfigLoader::with_paths(Vec::new()).load();

        unsafe {
            std::env::remove_var("ECG_REPLAY_STREAM__BEAT_PAUSE_MS");
        }

        assert_eq!(config.unwrap().stream.beat_pause_ms, 500);
    }
}
