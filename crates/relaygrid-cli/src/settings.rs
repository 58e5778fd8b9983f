//! User settings read from `relaygrid.toml`.
//!
//! Looked up at `--settings` when given, otherwise in the platform config
//! directory (`~/.config/relaygrid/relaygrid.toml` on Linux). A missing
//! default file means built-in defaults; a missing explicit file is an error.

use crate::cli::OutputFormat;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RelaygridSettings {
    #[serde(default)]
    pub coordination: CoordinationSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinationSettings {
    /// Fault current at the faulted zone for the attenuating model, in amperes
    #[serde(default = "default_base_current")]
    pub base_current_a: f64,
    /// "auto" or a worker count
    #[serde(default = "default_threads")]
    pub threads: String,
}

impl Default for CoordinationSettings {
    fn default() -> Self {
        Self {
            base_current_a: default_base_current(),
            threads: default_threads(),
        }
    }
}

fn default_base_current() -> f64 {
    1000.0
}

fn default_threads() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelaygridSettings {
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow!("invalid logging.level '{}' in settings", self.logging.level))
    }
}

/// `<config dir>/relaygrid/relaygrid.toml`, if the platform has a config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("relaygrid").join("relaygrid.toml"))
}

pub fn load_settings(explicit: Option<&Path>) -> Result<RelaygridSettings> {
    match explicit {
        Some(path) => read_settings(path),
        None => match default_settings_path() {
            Some(path) if path.exists() => read_settings(&path),
            _ => Ok(RelaygridSettings::default()),
        },
    }
}

fn read_settings(path: &Path) -> Result<RelaygridSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings '{}'", path.display()))?;
    let settings: RelaygridSettings = toml::from_str(&contents)
        .with_context(|| format!("parsing settings '{}'", path.display()))?;
    if !settings.coordination.base_current_a.is_finite()
        || settings.coordination.base_current_a <= 0.0
    {
        return Err(anyhow!(
            "coordination.base_current_a must be positive, got {}",
            settings.coordination.base_current_a
        ));
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaygrid.toml");
        fs::write(&path, "[output]\nformat = \"json\"\n").unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.output.format, OutputFormat::Json);
        assert_eq!(settings.coordination, CoordinationSettings::default());
        assert_eq!(settings.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(load_settings(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relaygrid.toml");
        fs::write(&path, "[coordination]\nbase_current_a = -5.0\n").unwrap();
        assert!(load_settings(Some(&path)).is_err());
        fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(load_settings(Some(&path)).unwrap().log_level().is_err());
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&RelaygridSettings::default()).unwrap();
        let parsed: RelaygridSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, RelaygridSettings::default());
    }
}
