//! Runtime configuration.
//!
//! Read from the environment (a `.env` file is loaded first by the binary).
//!
//! | Variable                       | Default                      |
//! |--------------------------------|------------------------------|
//! | `ROSTERLOAD_API_URL`           | `http://localhost:8080/api`  |
//! | `ROSTERLOAD_API_TOKEN`         | unset                        |
//! | `ROSTERLOAD_ROW_DELAY_MS`      | `300`                        |
//! | `ROSTERLOAD_LINK_TIMEOUT_SECS` | `30` (`0` disables)          |
//! | `ROSTERLOAD_PORT`              | `3000`                       |
//! | `ROSTERLOAD_MAX_FILE_SIZE`     | `5242880` (5 MiB)            |

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::import::{ExecutorOptions, DEFAULT_LINK_TIMEOUT, DEFAULT_ROW_DELAY};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Practice backend base URL
    pub api_url: String,
    /// Bearer token for the practice backend
    pub api_token: Option<String>,
    pub row_delay: Duration,
    pub link_timeout: Option<Duration>,
    /// HTTP server port
    pub port: u16,
    /// Upload limit in bytes
    pub max_file_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            row_delay: DEFAULT_ROW_DELAY,
            link_timeout: Some(DEFAULT_LINK_TIMEOUT),
            port: DEFAULT_PORT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let row_delay_ms: u64 = parse_or(&get, "ROSTERLOAD_ROW_DELAY_MS", DEFAULT_ROW_DELAY.as_millis() as u64)?;
        let timeout_secs: u64 =
            parse_or(&get, "ROSTERLOAD_LINK_TIMEOUT_SECS", DEFAULT_LINK_TIMEOUT.as_secs())?;

        Ok(Self {
            api_url: get("ROSTERLOAD_API_URL").unwrap_or(defaults.api_url),
            api_token: get("ROSTERLOAD_API_TOKEN"),
            row_delay: Duration::from_millis(row_delay_ms),
            link_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            port: parse_or(&get, "ROSTERLOAD_PORT", defaults.port)?,
            max_file_size: parse_or(&get, "ROSTERLOAD_MAX_FILE_SIZE", defaults.max_file_size)?,
        })
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            row_delay: self.row_delay,
            link_timeout: self.link_timeout,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.row_delay, Duration::from_millis(300));
        assert_eq!(cfg.link_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("ROSTERLOAD_API_URL", "https://api.spa.test"),
            ("ROSTERLOAD_API_TOKEN", "secret"),
            ("ROSTERLOAD_ROW_DELAY_MS", "50"),
            ("ROSTERLOAD_LINK_TIMEOUT_SECS", "0"),
            ("ROSTERLOAD_PORT", "8088"),
        ])
        .unwrap();

        assert_eq!(cfg.api_url, "https://api.spa.test");
        assert_eq!(cfg.api_token.as_deref(), Some("secret"));
        assert_eq!(cfg.executor_options().row_delay, Duration::from_millis(50));
        assert_eq!(cfg.link_timeout, None);
        assert_eq!(cfg.port, 8088);
    }

    #[test]
    fn test_invalid_value() {
        let err = config(&[("ROSTERLOAD_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("ROSTERLOAD_PORT"));
        assert!(err.to_string().contains("eighty"));
    }

    #[test]
    fn test_empty_value_keeps_default() {
        let cfg = config(&[("ROSTERLOAD_API_TOKEN", ""), ("ROSTERLOAD_PORT", " ")]).unwrap();
        assert_eq!(cfg.api_token, None);
        assert_eq!(cfg.port, DEFAULT_PORT);
    }
}
