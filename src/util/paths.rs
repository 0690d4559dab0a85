//! Path utilities for the evidence-pack data directory

use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variable overriding the default data directory
pub const DATA_DIR_ENV: &str = "EVIDENCE_PACK_HOME";

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, falls back to `$EVIDENCE_PACK_HOME`, then ~/.evidence-pack
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|h| h.join(".evidence-pack"))
        .unwrap_or_else(|| PathBuf::from(".evidence-pack"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise the default
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the logs directory (~/.evidence-pack/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.evidence-pack/logs/evidence-pack.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("evidence-pack.log")
}

/// Get the config file path (~/.evidence-pack/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the default directory packs are written under (~/.evidence-pack/packs)
pub fn default_packs_dir() -> PathBuf {
    data_dir().join("packs")
}
