use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: &str = "8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub mysql_host: String,
    pub mysql_port: u16,
    pub mysql_user: String,
    pub mysql_password: String,
    pub mysql_db: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("ANSWER_PORT", DEFAULT_PORT)?,
            mysql_host: try_load("MYSQL_HOST", "localhost")?,
            mysql_port: try_load("MYSQL_PORT", "3306")?,
            mysql_user: try_load("MYSQL_USER", "root")?,
            mysql_password: read_secret("MYSQL_PASSWORD"),
            mysql_db: var("MYSQL_DB").ok().filter(|db| !db.is_empty()),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            warn!("Invalid {key} value: {e}");
            Err(ConfigError::Invalid {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            })
        }
    }
}

/// Secret file first, so the password stays out of the environment, then the plain variable.
fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|e| {
            info!("No {secret_name} secret at {path} ({e}), falling back to environment");
            var(secret_name)
        })
        .unwrap_or_else(|_| {
            warn!("{secret_name} not provided, connecting without a password");
            String::new()
        })
}
