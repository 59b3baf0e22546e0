//! API key resolution for the Gemini backend.
//!
//! Resolution order:
//!
//! 1. `gemini.api_key` from the config file
//! 2. the secrets file (`{"gemini": {"api_key": "..."}}`, also accepting
//!    `apiKey`, or `api_key_env_var` naming another environment variable)
//! 3. the `GEMINI_API_KEY` environment variable
//!
//! Key material is never logged.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::GeminiConfig;

/// Environment variable consulted last.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Resolve the Gemini API key, or `None` when no source provides one.
pub fn resolve_gemini_api_key(config: &GeminiConfig, secrets_file: &Path) -> Option<String> {
    resolve_with_env(config, secrets_file, |name| std::env::var(name).ok())
}

fn resolve_with_env<F>(config: &GeminiConfig, secrets_file: &Path, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |s: String| {
        let trimmed = s.trim().to_owned();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    if let Some(key) = non_empty(config.api_key.clone()) {
        debug!("using Gemini API key from config");
        return Some(key);
    }
    if let Some(key) = read_secrets_file(secrets_file, &env).and_then(non_empty) {
        debug!("using Gemini API key from {}", secrets_file.display());
        return Some(key);
    }
    let key = env(GEMINI_API_KEY_ENV).and_then(non_empty);
    if key.is_some() {
        debug!("using Gemini API key from {GEMINI_API_KEY_ENV}");
    }
    key
}

fn read_secrets_file<F>(path: &Path, env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("cannot read secrets file {}: {e}", path.display());
            return None;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("secrets file {} is not valid JSON: {e}", path.display());
            return None;
        }
    };
    let gemini = value.get("gemini")?;
    for field in ["api_key", "apiKey"] {
        if let Some(key) = gemini.get(field).and_then(|v| v.as_str()) {
            return Some(key.to_owned());
        }
    }
    gemini
        .get("api_key_env_var")
        .and_then(|v| v.as_str())
        .and_then(|name| env(name))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_key_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeminiConfig {
            api_key: "from-config".into(),
            ..Default::default()
        };
        let key = resolve_with_env(
            &config,
            &dir.path().join("apis.json"),
            env_of(&[(GEMINI_API_KEY_ENV, "from-env")]),
        );
        assert_eq!(key.as_deref(), Some("from-config"));
    }

    #[test]
    fn secrets_file_accepts_both_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apis.json");
        let config = GeminiConfig::default();

        std::fs::write(&path, r#"{"gemini": {"api_key": "snake"}}"#).unwrap();
        assert_eq!(resolve_with_env(&config, &path, env_of(&[])).as_deref(), Some("snake"));

        std::fs::write(&path, r#"{"gemini": {"apiKey": "camel"}}"#).unwrap();
        assert_eq!(resolve_with_env(&config, &path, env_of(&[])).as_deref(), Some("camel"));
    }

    #[test]
    fn secrets_file_can_name_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apis.json");
        std::fs::write(&path, r#"{"gemini": {"api_key_env_var": "MY_GEMINI"}}"#).unwrap();
        let key = resolve_with_env(
            &GeminiConfig::default(),
            &path,
            env_of(&[("MY_GEMINI", "indirect")]),
        );
        assert_eq!(key.as_deref(), Some("indirect"));
    }

    #[test]
    fn falls_back_to_environment() {
        let dir = tempfile::tempdir().unwrap();
        let key = resolve_with_env(
            &GeminiConfig::default(),
            &dir.path().join("missing.json"),
            env_of(&[(GEMINI_API_KEY_ENV, " env-key ")]),
        );
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn malformed_secrets_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apis.json");
        std::fs::write(&path, "{").unwrap();
        assert!(resolve_with_env(&GeminiConfig::default(), &path, env_of(&[])).is_none());
    }
}
