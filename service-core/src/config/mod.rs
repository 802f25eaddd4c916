use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Settings shared by every catalog service, read from an optional
/// `configuration` file and `APP__`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from an explicit file, without consulting the environment.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name(path).required(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        writeln!(file, "otlp_endpoint = \"http://collector:4317\"").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.log_level, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::from_file("/nonexistent/catalog-configuration").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
