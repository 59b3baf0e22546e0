//! Error types for the echohub-devices crate.
//!
//! Registry operations themselves never fail; these errors surface from the
//! persistence layer and from configuration validation, and are logged by the
//! registry rather than propagated to callers.

/// Errors that can occur while loading, saving, or configuring the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Reading or writing the registry file failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The registry file exists but does not contain a valid snapshot.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid registry configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;
