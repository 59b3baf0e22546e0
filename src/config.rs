//! Configuration types for the echohub server.
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! (or no file at all) yields a runnable configuration.

use echohub_devices::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HubError, Result};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Device registry storage and lifecycle tuning.
    pub registry: RegistryConfig,
    /// Model catalog settings.
    pub catalog: CatalogConfig,
    /// Gemini text-generation backend.
    pub gemini: GeminiConfig,
    /// Speech-to-text backend.
    pub stt: SttConfig,
    /// Two-pass assistant pipeline.
    pub assistant: AssistantConfig,
    /// Log filtering and file output.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Largest accepted request body, in bytes (audio uploads).
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Model catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog file. Defaults to `data_dir()/model_catalog.json`.
    pub path: Option<PathBuf>,
    /// Regenerate the catalog from the backends at startup.
    pub refresh_on_startup: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            refresh_on_startup: true,
        }
    }
}

/// Gemini REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API root, without the `/v1beta` suffix.
    pub base_url: String,
    /// API key. When empty, the secrets file and then `GEMINI_API_KEY` are consulted.
    pub api_key: String,
    /// Secrets file. Defaults to `config_dir()/secrets/apis.json`.
    pub secrets_file: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            api_key: String::new(),
            secrets_file: None,
        }
    }
}

/// Speech-to-text backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible transcription server.
    pub base_url: String,
    /// Bearer token for the transcription server (empty = none).
    pub api_key: String,
    /// Catalog name used when a request does not choose a model.
    pub default_model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_owned(),
            api_key: String::new(),
            default_model: "base".to_owned(),
        }
    }
}

/// Assistant pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Prompt template directory. Defaults to `config_dir()/prompt_templates/`.
    /// Missing files fall back to built-in templates.
    pub templates_dir: Option<PathBuf>,
    /// Model for pass 1 and pass 2 when the request does not choose one.
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            model: "gemini-2.5-flash-lite".to_owned(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Directory for daily-rotated log files. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            log_dir: None,
        }
    }
}

impl HubConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HubError::Config(e.to_string()))
    }

    /// Load from `path` when given, else from the default config file if it
    /// exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing or any file
    /// that is read fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = crate::dirs::config_file();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HubError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that would otherwise fail at first use.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.registry
            .validate()
            .map_err(|e| HubError::Config(e.to_string()))?;
        for (field, value) in [
            ("gemini.base_url", &self.gemini.base_url),
            ("stt.base_url", &self.stt.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| HubError::Config(format!("{field} is not a valid URL: {e}")))?;
        }
        if self.assistant.model.trim().is_empty() {
            return Err(HubError::Config("assistant.model must not be empty".into()));
        }
        if self.stt.default_model.trim().is_empty() {
            return Err(HubError::Config("stt.default_model must not be empty".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(HubError::Config("server.max_body_bytes must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry
            .path
            .clone()
            .unwrap_or_else(crate::dirs::registry_file)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog.path.clone().unwrap_or_else(crate::dirs::catalog_file)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.assistant
            .templates_dir
            .clone()
            .unwrap_or_else(crate::dirs::templates_dir)
    }

    pub fn secrets_file(&self) -> PathBuf {
        self.gemini
            .secrets_file
            .clone()
            .unwrap_or_else(crate::dirs::secrets_file)
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
