mod settings;

pub use settings::{Config, TomlConfig, DEFAULT_LOG_FILTER, EXAMPLE_CONFIG};
