use std::{env, path::PathBuf, str::FromStr};

use super::env::{AppConfig, ConfigError, DirectoryConfig, HttpConfig, LoggingConfig};

pub const DEFAULT_MODEL_PATH: &str = "spam_model.json";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_or("BIND_ADDR", "127.0.0.1:8000")?;

        let model_path = PathBuf::from(
            env::var("MODEL_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
        );

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME")
                .unwrap_or_else(|_| "spam_detector.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone = parse_or("APP_TIMEZONE", "UTC")?;

        let http = HttpConfig {
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", "5242880")?,
            cors_allow_any: parse_bool("CORS_ALLOW_ANY", true)?,
        };

        Ok(Self {
            bind_addr,
            model_path,
            directories,
            logging,
            timezone,
            http,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        Err(_) => Ok(default),
    }
}
