//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file (`tablon.toml`, or
//! the path in `TABLON_CONFIG`), then `TABLON_*` environment variables.

use crate::services::RateLimitConfig;
use crate::storage::CACHE_MAX_SIZE;
use ::config::{ConfigError, Environment, File};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const ENV_PREFIX: &str = "TABLON";
pub const DEFAULT_CONFIG_FILE: &str = "tablon";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub database_path: String,
    /// Origin allowed to make credentialed cross-origin requests
    pub allowed_origin: String,
    /// Key used to sign CSRF tokens. Generated per process when empty.
    #[serde(default)]
    pub session_secret: String,
    pub session_ttl_secs: u64,
    pub secure_cookies: bool,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub cache_max_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            database_path: "./mensajes.db".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
            session_secret: String::new(),
            session_ttl_secs: 86_400,
            secure_cookies: false,
            rate_limit_max_requests: 500,
            rate_limit_window_secs: 15 * 60,
            cache_max_size: CACHE_MAX_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load from the config file named by `TABLON_CONFIG` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&file, Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load_from(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = ::config::Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("database_path", defaults.database_path)?
            .set_default("allowed_origin", defaults.allowed_origin)?
            .set_default("session_secret", defaults.session_secret)?
            .set_default("session_ttl_secs", defaults.session_ttl_secs as i64)?
            .set_default("secure_cookies", defaults.secure_cookies)?
            .set_default(
                "rate_limit_max_requests",
                i64::from(defaults.rate_limit_max_requests),
            )?
            .set_default(
                "rate_limit_window_secs",
                defaults.rate_limit_window_secs as i64,
            )?
            .set_default("cache_max_size", defaults.cache_max_size as i64)?
            .add_source(File::with_name(file).required(false))
            .add_source(env.try_parsing(true))
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.validate()?;

        if config.session_secret.is_empty() {
            warn!("TABLON_SESSION_SECRET not set, using a random per-process secret");
            config.session_secret = random_secret();
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_max_size == 0 {
            return Err(ConfigError::Message(
                "cache_max_size must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit_max_requests == 0 || self.rate_limit_window_secs == 0 {
            return Err(ConfigError::Message(
                "rate limit requests and window must be greater than zero".to_string(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "session_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max_requests,
            window: Duration::from_secs(self.rate_limit_window_secs),
            ..RateLimitConfig::default()
        }
    }
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load_from("does-not-exist", env(&[])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:4000");
        assert_eq!(config.database_path, "./mensajes.db");
        assert_eq!(config.cache_max_size, 50);
        assert_eq!(config.rate_limit().max_requests, 500);
        assert_eq!(config.rate_limit().window, Duration::from_secs(900));
        assert_eq!(config.session_secret.len(), 48);
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServerConfig::load_from(
            "does-not-exist",
            env(&[
                ("TABLON_BIND_ADDRESS", "127.0.0.1:8080"),
                ("TABLON_RATE_LIMIT_MAX_REQUESTS", "20"),
                ("TABLON_SECURE_COOKIES", "true"),
                ("TABLON_SESSION_SECRET", "s3cret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.rate_limit_max_requests, 20);
        assert!(config.secure_cookies);
        assert_eq!(config.session_secret, "s3cret");
    }

    #[test]
    fn test_rejects_zero_cache_size() {
        let result = ServerConfig::load_from(
            "does-not-exist",
            env(&[("TABLON_CACHE_MAX_SIZE", "0")]),
        );
        assert!(result.is_err());
    }
}
