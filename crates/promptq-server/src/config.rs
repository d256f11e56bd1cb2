//! Server configuration from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use promptq_core::DispatchConfig;
use promptq_core::impls::DEFAULT_TIMEOUT;

pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Echo,
    OpenAi {
        api_key: String,
        base_url: Option<String>,
        timeout: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub dispatch: DispatchConfig,
    pub store: StoreConfig,
    pub provider: ProviderConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind = parse_or(&var, "PROMPTQ_BIND", || DEFAULT_BIND)?;

        let mut dispatch = DispatchConfig::default();
        dispatch.worker_count = parse_or(&var, "PROMPTQ_WORKERS", || dispatch.worker_count)?;
        dispatch.record_ttl = Duration::from_secs(parse_or(&var, "PROMPTQ_TTL_SECS", || {
            dispatch.record_ttl.as_secs()
        })?);
        dispatch.max_pending = parse_opt(&var, "PROMPTQ_MAX_PENDING")?;
        if let Some(model) = var("PROMPTQ_MODEL") {
            dispatch.completion.model = model;
        }
        dispatch.completion.max_tokens =
            parse_or(&var, "PROMPTQ_MAX_TOKENS", || dispatch.completion.max_tokens)?;
        dispatch.completion.temperature =
            parse_or(&var, "PROMPTQ_TEMPERATURE", || dispatch.completion.temperature)?;

        let store = match var("PROMPTQ_STORE").as_deref() {
            None | Some("redis") => StoreConfig::Redis {
                url: redis_url(&var)?,
            },
            Some("memory") => StoreConfig::Memory,
            Some(other) => return Err(invalid("PROMPTQ_STORE", other, "expected redis or memory")),
        };

        let provider = match var("PROMPTQ_PROVIDER").as_deref() {
            None | Some("openai") => ProviderConfig::OpenAi {
                api_key: var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
                base_url: var("OPENAI_BASE_URL"),
                timeout: Duration::from_secs(parse_or(
                    &var,
                    "PROMPTQ_PROVIDER_TIMEOUT_SECS",
                    || DEFAULT_TIMEOUT.as_secs(),
                )?),
            },
            Some("echo") => ProviderConfig::Echo,
            Some(other) => {
                return Err(invalid("PROMPTQ_PROVIDER", other, "expected openai or echo"));
            }
        };

        Ok(Self {
            bind,
            dispatch,
            store,
            provider,
        })
    }
}

/// `REDIS_URL` wins; otherwise assembled from `REDIS_HOST`/`REDIS_PORT`/`REDIS_DB`.
fn redis_url(var: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    if let Some(url) = var("REDIS_URL") {
        return Ok(url);
    }
    let host = var("REDIS_HOST").unwrap_or_else(|| "localhost".to_string());
    let port: u16 = parse_or(var, "REDIS_PORT", || 6379)?;
    let db: u32 = parse_or(var, "REDIS_DB", || 0)?;
    Ok(format!("redis://{host}:{port}/{db}"))
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_opt<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| raw.trim().parse().map_err(|e| invalid(key, &raw, e)))
        .transpose()
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(var, key)?.unwrap_or_else(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_follow_dispatch_defaults() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.dispatch, DispatchConfig::default());
        assert_eq!(
            cfg.store,
            StoreConfig::Redis {
                url: "redis://localhost:6379/0".to_string()
            }
        );
        assert_eq!(
            cfg.provider,
            ProviderConfig::OpenAi {
                api_key: "sk-test".to_string(),
                base_url: None,
                timeout: Duration::from_secs(60),
            }
        );
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("PROMPTQ_BIND", "0.0.0.0:9000"),
            ("PROMPTQ_WORKERS", "8"),
            ("PROMPTQ_TTL_SECS", "120"),
            ("PROMPTQ_MAX_PENDING", "500"),
            ("PROMPTQ_MODEL", "gpt-4o"),
            ("PROMPTQ_STORE", "memory"),
            ("PROMPTQ_PROVIDER", "echo"),
        ])
        .unwrap();
        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.dispatch.worker_count, 8);
        assert_eq!(cfg.dispatch.record_ttl, Duration::from_secs(120));
        assert_eq!(cfg.dispatch.max_pending, Some(500));
        assert_eq!(cfg.dispatch.completion.model, "gpt-4o");
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.provider, ProviderConfig::Echo);
    }

    #[test]
    fn redis_parts_build_url() {
        let cfg = config(&[
            ("PROMPTQ_PROVIDER", "echo"),
            ("REDIS_HOST", "cache"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "2"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreConfig::Redis {
                url: "redis://cache:6380/2".to_string()
            }
        );
    }

    #[test]
    fn openai_needs_a_key() {
        assert_eq!(
            config(&[("PROMPTQ_STORE", "memory")]).unwrap_err(),
            ConfigError::Missing("OPENAI_API_KEY")
        );
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config(&[("PROMPTQ_PROVIDER", "echo"), ("PROMPTQ_WORKERS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROMPTQ_WORKERS", .. }));

        let err = config(&[("PROMPTQ_PROVIDER", "echo"), ("PROMPTQ_STORE", "postgres")]).unwrap_err();
        assert!(err.to_string().contains("PROMPTQ_STORE"));
    }
}
