//! Application configuration from environment variables.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub environment: Environment,
    /// Largest single funding amount accepted, in minor units.
    pub max_funding_minor_units: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

const DEFAULT_MAX_FUNDING_MINOR_UNITS: i64 = 1_000_000;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 3000)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let environment = match env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let max_funding_minor_units =
            parse_var("MAX_FUNDING_MINOR_UNITS", DEFAULT_MAX_FUNDING_MINOR_UNITS)?;
        if max_funding_minor_units < 1 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_FUNDING_MINOR_UNITS",
                value: max_funding_minor_units.to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            database_url,
            environment,
            max_funding_minor_units,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Environment-variable reads race across tests, so only exercise
        // names no other test sets.
        env::remove_var("MAX_FUNDING_MINOR_UNITS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_funding_minor_units, 1_000_000);
        assert!(!config.bind_address().is_empty());
    }
}
