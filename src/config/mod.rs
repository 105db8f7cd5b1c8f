pub mod env;
mod loader;

pub use env::{AppConfig, ConfigError, DirectoryConfig, HttpConfig, LoggingConfig};
pub use loader::{load_config, DEFAULT_MODEL_PATH};
