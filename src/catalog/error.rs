//! Catalog error types.

/// Errors raised while resolving or persisting the model catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The request did not name a model.
    #[error("{0}")]
    Validation(String),

    /// The named model is not in the catalog.
    #[error("{kind} model '{name}' not found. Available: {}", available.join(", "))]
    NotFound {
        kind: &'static str,
        name: String,
        available: Vec<String>,
    },

    /// The catalog file could not be read or written.
    #[error("catalog persistence error: {0}")]
    Persistence(String),

    /// The catalog file is not valid JSON.
    #[error("catalog parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_available_names() {
        let err = CatalogError::NotFound {
            kind: "STT",
            name: "huge".into(),
            available: vec!["tiny".into(), "base".into()],
        };
        assert_eq!(
            err.to_string(),
            "STT model 'huge' not found. Available: tiny, base"
        );
    }
}
