use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::util::paths::{config_path, data_dir, default_packs_dir};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Default tracing filter for the log file
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory packs are written under and listed from
    pub packs_dir: PathBuf,
    /// Pretty-print JSON emitted on stdout
    pub pretty_output: bool,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packs_dir: default_packs_dir(),
            pretty_output: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlPacksConfig {
    /// Relative paths resolve against the data directory
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlOutputConfig {
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlLoggingConfig {
    pub filter: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Pack storage configuration
    pub packs: Option<TomlPacksConfig>,
    /// CLI output configuration
    pub output: Option<TomlOutputConfig>,
    /// Logging configuration
    pub logging: Option<TomlLoggingConfig>,
}

impl Config {
    /// Load configuration from the data directory, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`, merging with defaults.
    ///
    /// A missing or malformed file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let Ok(contents) = fs::read_to_string(path) else {
            return config;
        };
        match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => config.merge(toml_config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
            }
        }

        config
    }

    fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(dir) = toml_config.packs.and_then(|p| p.dir) {
            self.packs_dir = if dir.is_absolute() {
                dir
            } else {
                data_dir().join(dir)
            };
        }

        if let Some(pretty) = toml_config.output.and_then(|o| o.pretty) {
            self.pretty_output = pretty;
        }

        if let Some(filter) = toml_config.logging.and_then(|l| l.filter) {
            self.log_filter = filter;
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create config directory: {}", e);
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            eprintln!("Failed to write default config: {}", e);
        }
    }
}
