// src/config.rs
use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and endpoints of the upstream payments API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub auth_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_ssl: bool,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: Option<String>,
    pub upstream: UpstreamConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let host = match lookup("HOST") {
            Some(h) => h.parse().map_err(|_| ConfigError::Invalid { name: "HOST", value: h })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let upstream_api_url = lookup("UPSTREAM_API_URL").unwrap_or_default();
        let upstream_auth_url = lookup("UPSTREAM_AUTH_URL")
            .unwrap_or_else(|| format!("{}/auth/token", upstream_api_url.trim_end_matches('/')));

        Ok(Config {
            database_url,
            database_ssl: parse_bool(&lookup, "DATABASE_SSL", false)?,
            database_max_connections: parse_number(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_bool(&lookup, "RUN_MIGRATIONS", false)?,
            host,
            port: parse_number(&lookup, "PORT", 3000)?,
            cors_origin: lookup("CORS_ORIGIN").filter(|v| !v.trim().is_empty()),
            upstream: UpstreamConfig {
                api_url: upstream_api_url.trim_end_matches('/').to_string(),
                auth_url: upstream_auth_url,
                api_key: lookup("UPSTREAM_API_KEY").unwrap_or_default(),
                api_secret: lookup("UPSTREAM_API_SECRET").unwrap_or_default(),
                timeout_secs: parse_number(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?,
            },
        })
    }
}

fn parse_bool<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: v }),
        },
    }
}

fn parse_number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}
