use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

use crate::services::{TotpAlgorithm, TotpParams};

#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub access: AccessSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

/// Behaviour switches for the access core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSettings {
    /// When off, a known API key is enough to authenticate.
    pub auth_enabled: bool,
    /// When off, every record and file is visible to everyone.
    pub view_permissions_enabled: bool,
    pub totp: TotpParams,
    /// Accept any code in a window that already validated for the identity.
    pub trust_same_window: bool,
    pub api_key_max_length: usize,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            auth_enabled: true,
            view_permissions_enabled: true,
            totp: TotpParams::default(),
            trust_same_window: true,
            api_key_max_length: 128,
        }
    }
}

impl AccessConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_source(common_config, |key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_source<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let get = |key: &str, default: Option<&str>, required_in_prod: bool| {
            get_env(&lookup, key, default, is_prod && required_in_prod)
        };

        let otlp_endpoint = lookup("OTLP_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| common.otlp_endpoint.clone());

        let config = AccessConfig {
            environment: environment.clone(),
            service_name: get("SERVICE_NAME", Some("catalog-access"), false)?,
            log_level: get("LOG_LEVEL", Some(common.log_level.as_str()), false)?,
            otlp_endpoint,
            database: DatabaseConfig {
                url: SecretString::new(get("DATABASE_URL", None, true)?),
                max_connections: parse(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS", Some("10"), false)?,
                )?,
            },
            access: AccessSettings {
                auth_enabled: parse_bool("AUTH_ENABLED", get("AUTH_ENABLED", Some("true"), true)?)?,
                view_permissions_enabled: parse_bool(
                    "VIEW_PERMISSIONS_ENABLED",
                    get("VIEW_PERMISSIONS_ENABLED", Some("true"), true)?,
                )?,
                totp: TotpParams {
                    step_seconds: parse(
                        "TOTP_STEP_SECONDS",
                        get("TOTP_STEP_SECONDS", Some("300"), false)?,
                    )?,
                    epoch_seconds: parse(
                        "TOTP_EPOCH_SECONDS",
                        get("TOTP_EPOCH_SECONDS", Some("0"), false)?,
                    )?,
                    digits: parse("TOTP_DIGITS", get("TOTP_DIGITS", Some("6"), false)?)?,
                    algorithm: get("TOTP_ALGORITHM", Some("sha1"), false)?
                        .parse::<TotpAlgorithm>()
                        .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                    drift_windows: parse(
                        "TOTP_DRIFT_WINDOWS",
                        get("TOTP_DRIFT_WINDOWS", Some("1"), false)?,
                    )?,
                },
                trust_same_window: parse_bool(
                    "TOTP_TRUST_SAME_WINDOW",
                    get("TOTP_TRUST_SAME_WINDOW", Some("true"), false)?,
                )?,
                api_key_max_length: parse(
                    "API_KEY_MAX_LENGTH",
                    get("API_KEY_MAX_LENGTH", Some("128"), false)?,
                )?,
            },
            common,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.database.max_connections == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MAX_CONNECTIONS must be greater than 0"
            )));
        }

        if self.access.totp.step_seconds <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOTP_STEP_SECONDS must be positive"
            )));
        }

        if !(1..=9).contains(&self.access.totp.digits) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOTP_DIGITS must be between 1 and 9"
            )));
        }

        if self.access.api_key_max_length == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "API_KEY_MAX_LENGTH must be greater than 0"
            )));
        }

        if self.environment == Environment::Prod {
            if !self.access.auth_enabled {
                tracing::error!("Authentication is disabled in production - any known API key is accepted");
            }
            if self.access.trust_same_window {
                tracing::warn!("TOTP_TRUST_SAME_WINDOW is on - codes are not re-checked within an accepted window");
            }
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse<T>(key: &str, value: String) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
    })
}

fn parse_bool(key: &str, value: String) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be a boolean, got '{}'",
            key,
            other
        ))),
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
