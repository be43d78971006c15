//! Process settings for the `carfinder` binary.
//!
//! Values come from the environment; a `.env` file in the working directory
//! is loaded first if present. Unset keys fall back to defaults, malformed
//! numeric keys are an error.

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;
use tracing::debug;
use crate::error::ConfigError;
use crate::providers::{DEFAULT_CSE_ID, DEFAULT_RDW_URL, DEFAULT_VISION_MODEL};
use crate::types::FinderConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

static ENV_LOADER: Once = Once::new();

/// Loads `.env` into the process environment, once.
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
    });
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub google_api_key:  Option<String>,
    pub google_cse_id:   String,
    pub openai_api_key:  Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model:    String,
    pub rdw_base_url:    String,
    pub finder:          FinderConfig,
    pub bind:            SocketAddr,
}

impl Settings {
    /// Reads settings from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        ensure_env_loaded();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let number = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            match get(key) {
                None => Ok(None),
                Some(value) => match value.parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Some(n)),
                    _ => Err(ConfigError::InvalidNumber { key, value }),
                },
            }
        };

        let mut finder = FinderConfig::default();
        if let Some(n) = number("CARFINDER_ATTEMPT_LIMIT")? {
            finder.attempt_limit = u32::try_from(n).map_err(|_| ConfigError::InvalidNumber {
                key:   "CARFINDER_ATTEMPT_LIMIT",
                value: n.to_string(),
            })?;
        }
        if let Some(secs) = number("CARFINDER_CALL_TIMEOUT_SECS")? {
            finder.call_timeout = Duration::from_secs(secs);
        }

        let bind_raw = get("CARFINDER_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse::<SocketAddr>().map_err(|source| ConfigError::InvalidBind {
            value: bind_raw.clone(),
            source,
        })?;

        Ok(Self {
            google_api_key:  get("GOOGLE_API_KEY"),
            google_cse_id:   get("GOOGLE_CSE_ID").unwrap_or_else(|| DEFAULT_CSE_ID.to_string()),
            openai_api_key:  get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_model:    get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            rdw_base_url:    get("RDW_BASE_URL").unwrap_or_else(|| DEFAULT_RDW_URL.to_string()),
            finder,
            bind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.google_api_key, None);
        assert_eq!(s.google_cse_id, DEFAULT_CSE_ID);
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.rdw_base_url, DEFAULT_RDW_URL);
        assert_eq!(s.finder.attempt_limit, 10);
        assert_eq!(s.finder.call_timeout, Duration::from_secs(10));
        assert_eq!(s.bind, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("CARFINDER_ATTEMPT_LIMIT", "4"),
            ("CARFINDER_CALL_TIMEOUT_SECS", "3"),
            ("CARFINDER_BIND", "0.0.0.0:9000"),
            ("GOOGLE_API_KEY", "  key  "),
            ("OPENAI_MODEL", "gpt-4o"),
        ]).unwrap();
        assert_eq!(s.finder.attempt_limit, 4);
        assert_eq!(s.finder.call_timeout, Duration::from_secs(3));
        assert_eq!(s.bind.port(), 9000);
        assert_eq!(s.google_api_key.as_deref(), Some("key"));
        assert_eq!(s.openai_model, "gpt-4o");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = settings(&[("GOOGLE_API_KEY", "   "), ("CARFINDER_ATTEMPT_LIMIT", "")]).unwrap();
        assert_eq!(s.google_api_key, None);
        assert_eq!(s.finder.attempt_limit, 10);
    }

    #[test]
    fn rejects_bad_numbers_and_addresses() {
        assert!(matches!(
            settings(&[("CARFINDER_ATTEMPT_LIMIT", "ten")]),
            Err(ConfigError::InvalidNumber { key: "CARFINDER_ATTEMPT_LIMIT", .. })
        ));
        assert!(matches!(
            settings(&[("CARFINDER_ATTEMPT_LIMIT", "0")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            settings(&[("CARFINDER_BIND", "localhost")]),
            Err(ConfigError::InvalidBind { .. })
        ));
    }
}
