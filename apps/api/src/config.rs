use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Snapshots go to Redis when set, otherwise to process memory.
    pub redis_url: Option<String>,
    pub storage_namespace: String,
    pub snapshot_ttl: Option<Duration>,
    pub career_os_submit_url: String,
    pub contributor_submit_url: String,
    pub submission_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            redis_url: lookup("REDIS_URL").filter(|s| !s.is_empty()),
            storage_namespace: lookup("STORAGE_NAMESPACE").unwrap_or_else(|| "funnel".to_string()),
            snapshot_ttl: match lookup("SNAPSHOT_TTL_SECS") {
                Some(raw) => Some(Duration::from_secs(
                    raw.parse::<u64>()
                        .context("SNAPSHOT_TTL_SECS must be a whole number of seconds")?,
                )),
                None => None,
            },
            career_os_submit_url: require("CAREER_OS_SUBMIT_URL")?,
            contributor_submit_url: require("CONTRIBUTOR_SUBMIT_URL")?,
            submission_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SUBMISSION_TIMEOUT_SECS",
                15,
            )?),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("CAREER_OS_SUBMIT_URL", "http://backend/career-os"),
        ("CONTRIBUTOR_SUBMIT_URL", "http://backend/contributors"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_namespace, "funnel");
        assert_eq!(config.submission_timeout, Duration::from_secs(15));
        assert!(config.redis_url.is_none());
        assert!(config.snapshot_ttl.is_none());
    }

    #[test]
    fn test_missing_submit_url_fails() {
        let err = Config::from_lookup(lookup(&[("CAREER_OS_SUBMIT_URL", "http://x")])).unwrap_err();
        assert!(err.to_string().contains("CONTRIBUTOR_SUBMIT_URL"));
    }

    #[test]
    fn test_invalid_port_fails() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_optional_values_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("REDIS_URL", "redis://127.0.0.1/"));
        vars.push(("SNAPSHOT_TTL_SECS", "604800"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
        assert_eq!(config.snapshot_ttl, Some(Duration::from_secs(604800)));
    }
}
