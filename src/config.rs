//! Configuration management for the instantiation engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (engine.toml)
//! - Environment variables (TYPE_ENGINE__*)
//!
//! ## Example config file (engine.toml):
//! ```toml
//! [limits]
//! max_depth = 512
//! max_call_depth = 64
//! max_template_combinations = 10000
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::engine::{Instantiator, Limits};

/// Main configuration for the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recursion limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Output settings for the CLI
    #[serde(default)]
    pub output: OutputConfig,
}

/// Recursion limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    #[serde(default = "default_max_template_combinations")]
    pub max_template_combinations: usize,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_max_depth() -> usize {
    Limits::default().max_depth
}

fn default_max_call_depth() -> usize {
    Limits::default().max_call_depth
}

fn default_max_template_combinations() -> usize {
    Limits::default().max_template_combinations
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_call_depth: default_max_call_depth(),
            max_template_combinations: default_max_template_combinations(),
        }
    }
}

impl From<&LimitsConfig> for Limits {
    fn from(config: &LimitsConfig) -> Self {
        Limits {
            max_depth: config.max_depth,
            max_call_depth: config.max_call_depth,
            max_template_combinations: config.max_template_combinations,
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["engine.toml", ".engine.toml", "config/engine.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "type-engine") {
            let xdg_config = config_dir.config_dir().join("engine.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (TYPE_ENGINE__*)
        builder = builder.add_source(
            Environment::with_prefix("TYPE_ENGINE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    pub fn limits(&self) -> Limits {
        Limits::from(&self.limits)
    }

    /// Instantiator configured with these limits
    pub fn instantiator(&self) -> Instantiator {
        Instantiator::new(self.limits())
    }
}
