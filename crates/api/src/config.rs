use anyhow::{Context, Result, anyhow};
use extract::GeminiConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Names a JSON file with the base configuration
pub const CONFIG_PATH_VAR: &str = "CHARTGEN_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// File named by `CHARTGEN_CONFIG` (if any), then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(endpoint) = lookup("GEMINI_ENDPOINT") {
            self.gemini.endpoint = endpoint;
        }
        if let Some(addr) = lookup("CHARTGEN_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(v) = parse_var(lookup, "CHARTGEN_MAX_ATTEMPTS")? {
            self.gemini.retry.max_attempts = v;
        }
        if let Some(v) = parse_var(lookup, "CHARTGEN_BACKOFF_UNIT_MS")? {
            self.gemini.retry.backoff_unit_ms = v;
        }
        if let Some(v) = parse_var(lookup, "CHARTGEN_REQUEST_TIMEOUT_SECS")? {
            self.gemini.request_timeout_secs = v;
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Invalid value {:?} for {}: {}", raw, name, e))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AppConfig::load_with(env(&[])).unwrap();

        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.gemini.retry.max_attempts, 3);
        assert!(config.gemini.api_key.is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::load_with(env(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_ENDPOINT", "http://localhost:9999/generate"),
            ("CHARTGEN_MAX_ATTEMPTS", "5"),
            ("CHARTGEN_BACKOFF_UNIT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.gemini.api_key, "k");
        assert_eq!(config.gemini.endpoint, "http://localhost:9999/generate");
        assert_eq!(config.gemini.retry.max_attempts, 5);
        assert_eq!(config.gemini.retry.backoff_unit_ms, 250);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = AppConfig::load_with(env(&[("CHARTGEN_MAX_ATTEMPTS", "three")])).unwrap_err();
        assert!(err.to_string().contains("CHARTGEN_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"bind_addr": "127.0.0.1:8080"}}, "gemini": {{"request_timeout_secs": 5}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = AppConfig::load_with(env(&[
            (CONFIG_PATH_VAR, path.as_str()),
            ("CHARTGEN_REQUEST_TIMEOUT_SECS", "9"),
        ]))
        .unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.gemini.request_timeout_secs, 9);
        assert_eq!(config.gemini.retry.backoff_unit_ms, 1000);
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_with(env(&[(CONFIG_PATH_VAR, "/nonexistent/chartgen.json")]))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
