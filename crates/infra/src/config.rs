//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use sealforge_core::CompanyId;

use crate::sweeper::SweeperConfig;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Which store family backs the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub sweeper: SweeperConfig,
    /// Companies registered as active in the in-memory directory.
    pub dev_company_ids: Vec<CompanyId>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let persistent = match lookup("USE_PERSISTENT_STORES") {
            Some(raw) => parse_bool("USE_PERSISTENT_STORES", &raw)?,
            None => false,
        };
        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StoreBackend::Postgres { database_url }
        } else {
            StoreBackend::InMemory
        };

        let defaults = SweeperConfig::default();
        let interval = secs(&lookup, "SWEEP_INTERVAL_SECS", defaults.interval)?;
        let batch_timeout = secs(&lookup, "SWEEP_BATCH_TIMEOUT_SECS", defaults.batch_timeout)?;
        let batch_size = match lookup("SWEEP_BATCH_SIZE") {
            Some(raw) => positive("SWEEP_BATCH_SIZE", &raw)?,
            None => defaults.batch_size,
        };

        let dev_company_ids = match lookup("DEV_COMPANY_IDS") {
            Some(raw) => company_ids("DEV_COMPANY_IDS", &raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            store,
            dev_company_ids,
            sweeper: defaults
                .with_interval(interval)
                .with_batch_size(batch_size)
                .with_batch_timeout(batch_timeout),
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn company_ids(var: &'static str, raw: &str) -> Result<Vec<CompanyId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<CompanyId>().map_err(|e| ConfigError::Invalid {
                var,
                value: raw.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn secs<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => positive(var, &raw).map(|n| Duration::from_secs(u64::from(n))),
        None => Ok(default),
    }
}
