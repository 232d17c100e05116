use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::io::output_file_name;
use crate::models::{MAX_GEOMETRY_PRECISION, MergeConfig};

/// Root application configuration, loaded from `~/.config/geofuse/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fusion: FusionDefaults,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Starting values for a merge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionDefaults {
    pub default_id_property: String,
    pub geometry_precision: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub file_prefix: String,
    pub pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    pub level: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for FusionDefaults {
    fn default() -> Self {
        Self {
            default_id_property: "iso_a3".to_string(),
            geometry_precision: 6,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: "merged".to_string(),
            pretty: false,
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

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/geofuse/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("GEOFUSE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("geofuse")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load and validate config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fusion.geometry_precision > MAX_GEOMETRY_PRECISION {
            return Err(FusionError::InvalidConfig(format!(
                "fusion.geometry_precision must be at most {MAX_GEOMETRY_PRECISION}, got {}",
                self.fusion.geometry_precision
            )));
        }
        if self.output.file_prefix.trim().is_empty() {
            return Err(FusionError::InvalidConfig(
                "output.file_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    // ─── Derived values ────────────────────────────────────

    /// Default merge policy seeded with the configured ID property and precision.
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            id_property: self.fusion.default_id_property.to_lowercase(),
            geometry_precision: self.fusion.geometry_precision.min(MAX_GEOMETRY_PRECISION),
            ..MergeConfig::default()
        }
    }

    /// Where a fused collection produced at `now` is written by default.
    pub fn output_path(&self, now: DateTime<Utc>) -> PathBuf {
        PathBuf::from(&self.output.directory).join(output_file_name(&self.output.file_prefix, now))
    }
}
