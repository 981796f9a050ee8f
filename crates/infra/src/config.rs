//! Configuration loading from the process environment.

use std::time::Duration;

use thiserror::Error;

use crate::ledger::DEFAULT_HISTORY_LIMIT_MAX;
use crate::orders::DEFAULT_ORDER_NUMBER_ATTEMPTS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Storefront runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub order_number_attempts: u32,
    pub history_limit_max: u32,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: u32,
}

impl StorefrontConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            db_max_connections: 10,
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
            history_limit_max: DEFAULT_HISTORY_LIMIT_MAX,
            outbox_poll_interval: Duration::from_millis(1_000),
            outbox_batch_size: 100,
        }
    }

    /// Read `DATABASE_URL` and the `GROUPBUY_*` settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StorefrontConfig::from_env`] over an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let defaults = Self::new(database_url);
        Ok(Self {
            db_max_connections: positive(
                &lookup,
                "GROUPBUY_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
            order_number_attempts: positive(
                &lookup,
                "GROUPBUY_ORDER_NUMBER_ATTEMPTS",
                defaults.order_number_attempts,
            )?,
            history_limit_max: positive(
                &lookup,
                "GROUPBUY_HISTORY_LIMIT_MAX",
                defaults.history_limit_max,
            )?,
            outbox_poll_interval: Duration::from_millis(u64::from(positive(
                &lookup,
                "GROUPBUY_OUTBOX_POLL_MS",
                defaults.outbox_poll_interval.as_millis() as u32,
            )?)),
            outbox_batch_size: positive(
                &lookup,
                "GROUPBUY_OUTBOX_BATCH",
                defaults.outbox_batch_size,
            )?,
            ..defaults
        })
    }
}

fn positive<F>(lookup: &F, var: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StorefrontConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let cfg = load(&[("DATABASE_URL", "postgres://localhost/groupbuy")]).unwrap();
        assert_eq!(cfg, StorefrontConfig::new("postgres://localhost/groupbuy"));
        assert_eq!(cfg.order_number_attempts, 5);
        assert_eq!(cfg.outbox_poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://db/groupbuy"),
            ("GROUPBUY_DB_MAX_CONNECTIONS", "32"),
            ("GROUPBUY_ORDER_NUMBER_ATTEMPTS", "8"),
            ("GROUPBUY_HISTORY_LIMIT_MAX", "200"),
            ("GROUPBUY_OUTBOX_POLL_MS", "250"),
            ("GROUPBUY_OUTBOX_BATCH", " 50 "),
        ])
        .unwrap();
        assert_eq!(cfg.db_max_connections, 32);
        assert_eq!(cfg.order_number_attempts, 8);
        assert_eq!(cfg.history_limit_max, 200);
        assert_eq!(cfg.outbox_poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.outbox_batch_size, 50);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        let err = load(&[("DATABASE_URL", "x"), ("GROUPBUY_OUTBOX_BATCH", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "GROUPBUY_OUTBOX_BATCH", .. }));

        let err = load(&[
            ("DATABASE_URL", "x"),
            ("GROUPBUY_ORDER_NUMBER_ATTEMPTS", "many"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "GROUPBUY_ORDER_NUMBER_ATTEMPTS", .. }));
    }
}
