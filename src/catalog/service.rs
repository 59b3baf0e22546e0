//! Shared, refreshable catalog with name resolution.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

use super::error::{CatalogError, Result};
use super::{AppCatalog, CatalogSection, ModelCatalog};
use crate::llm::TextBackend;
use crate::stt::SpeechBackend;

/// Model id used when the LM section is empty.
pub const FALLBACK_LM_MODEL: &str = "models/gemini-2.5-flash";

/// LM names tried, in order, when no model is requested.
const PREFERRED_LM_MODELS: &[&str] = &["gemini-flash-latest", "gemini-2.5-flash", "gemini-2.5-pro"];

/// Built-in Gemini list used when the backend cannot be queried.
pub fn fallback_lm_models() -> CatalogSection {
    [
        ("gemini-2.5-flash", "models/gemini-2.5-flash"),
        ("gemini-2.5-pro", "models/gemini-2.5-pro"),
        ("gemini-flash-latest", "models/gemini-flash-latest"),
        ("gemini-2.5-flash-lite", "models/gemini-2.5-flash-lite"),
    ]
    .into_iter()
    .collect()
}

/// Catalog held in memory and mirrored to a JSON file.
#[derive(Debug)]
pub struct CatalogService {
    path: Option<PathBuf>,
    catalog: RwLock<ModelCatalog>,
}

impl CatalogService {
    /// Load the catalog at `path`. A missing or unreadable file yields an
    /// empty catalog; the next [`refresh`](Self::refresh) rewrites it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let catalog = match load(&path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("starting with empty model catalog: {e}");
                ModelCatalog::default()
            }
        };
        Self {
            path: Some(path),
            catalog: RwLock::new(catalog),
        }
    }

    /// Catalog without a backing file.
    pub fn in_memory(catalog: ModelCatalog) -> Self {
        Self {
            path: None,
            catalog: RwLock::new(catalog),
        }
    }

    pub fn snapshot(&self) -> ModelCatalog {
        self.catalog
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Regenerate the catalog from the backends' advertised models and save it.
    ///
    /// The LM section falls back to [`fallback_lm_models`] when the text
    /// backend cannot list models or lists none.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persistence`] if the file cannot be written;
    /// the in-memory catalog is updated regardless.
    pub async fn refresh(
        &self,
        text: &dyn TextBackend,
        speech: &dyn SpeechBackend,
    ) -> Result<()> {
        let stt: CatalogSection = speech.advertised_models().into_iter().collect();

        let lm = match text.list_models().await {
            Ok(listings) if !listings.is_empty() => listings
                .into_iter()
                .map(|m| (m.display_name, m.id))
                .collect(),
            Ok(_) => {
                warn!("{} listed no models, using built-in LM list", text.name());
                fallback_lm_models()
            }
            Err(e) => {
                warn!("could not list {} models ({e}), using built-in LM list", text.name());
                fallback_lm_models()
            }
        };

        let catalog = ModelCatalog { stt, lm };
        info!(
            "model catalog updated: {} STT, {} LM models",
            catalog.stt.len(),
            catalog.lm.len()
        );
        *self.catalog.write().unwrap_or_else(|e| e.into_inner()) = catalog.clone();

        if let Some(path) = &self.path {
            save(path, &catalog)?;
            info!("model catalog saved to {}", path.display());
        }
        Ok(())
    }

    pub fn app_view(&self) -> AppCatalog {
        self.catalog
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .app_view()
    }

    /// Resolve an STT model name to `(name, repo_id)`.
    ///
    /// # Errors
    ///
    /// [`CatalogError::Validation`] for an empty name,
    /// [`CatalogError::NotFound`] when the name is not listed.
    pub fn resolve_stt(&self, name: &str) -> Result<(String, String)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("STT model name is required".into()));
        }
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        match catalog.stt.get(name) {
            Some(repo) => Ok((name.to_owned(), repo.to_owned())),
            None => Err(CatalogError::NotFound {
                kind: "STT",
                name: name.to_owned(),
                available: catalog.stt.names().map(String::from).collect(),
            }),
        }
    }

    /// Resolve an LM name to a backend model id. Never fails.
    pub fn resolve_lm(&self, name: Option<&str>) -> String {
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        let lm = &catalog.lm;

        if let Some(id) = name.map(str::trim).and_then(|n| lm.get(n)) {
            return id.to_owned();
        }
        PREFERRED_LM_MODELS
            .iter()
            .find_map(|candidate| lm.get(candidate))
            .or_else(|| lm.first().map(|(_, id)| id))
            .unwrap_or(FALLBACK_LM_MODEL)
            .to_owned()
    }
}

fn load(path: &Path) -> Result<ModelCatalog> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ModelCatalog::default()),
        Err(e) => {
            return Err(CatalogError::Persistence(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    serde_json::from_str(&text)
        .map_err(|e| CatalogError::Parse(format!("{}: {e}", path.display())))
}

fn save(path: &Path, catalog: &ModelCatalog) -> Result<()> {
    let persistence = |e: std::io::Error| {
        CatalogError::Persistence(format!("failed to write {}: {e}", path.display()))
    };
    let json = serde_json::to_string_pretty(catalog)
        .map_err(|e| CatalogError::Persistence(format!("failed to serialize catalog: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(persistence)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persistence)?;
    tmp.write_all(json.as_bytes()).map_err(persistence)?;
    tmp.as_file().sync_all().map_err(persistence)?;
    tmp.persist(path).map_err(|e| persistence(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::llm::{LlmError, ModelListing};
    use async_trait::async_trait;

    struct ListingBackend(std::result::Result<Vec<ModelListing>, ()>);

    #[async_trait]
    impl TextBackend for ListingBackend {
        fn name(&self) -> &str {
            "listing"
        }

        async fn generate(&self, _: &str, _: &str) -> std::result::Result<String, LlmError> {
            Ok(String::new())
        }

        async fn list_models(&self) -> std::result::Result<Vec<ModelListing>, LlmError> {
            self.0
                .clone()
                .map_err(|()| LlmError::RequestError("offline".into()))
        }
    }

    struct DefaultSpeech;

    #[async_trait]
    impl SpeechBackend for DefaultSpeech {
        fn name(&self) -> &str {
            "default"
        }

        async fn transcribe(&self, _: &Path, _: &str, _: Option<&str>) -> String {
            String::new()
        }
    }

    fn service_with_lm(entries: &[(&str, &str)]) -> CatalogService {
        CatalogService::in_memory(ModelCatalog {
            stt: [("base", "Systran/faster-whisper-base")].into_iter().collect(),
            lm: entries.iter().copied().collect(),
        })
    }

    #[test]
    fn resolve_lm_prefers_requested_name() {
        let service = service_with_lm(&[
            ("gemini-2.5-pro", "models/gemini-2.5-pro"),
            ("gemini-2.5-flash", "models/gemini-2.5-flash"),
        ]);
        assert_eq!(service.resolve_lm(Some("gemini-2.5-pro")), "models/gemini-2.5-pro");
    }

    #[test]
    fn resolve_lm_uses_preference_order() {
        let service = service_with_lm(&[
            ("gemini-2.5-pro", "models/gemini-2.5-pro"),
            ("gemini-2.5-flash", "models/gemini-2.5-flash"),
        ]);
        assert_eq!(service.resolve_lm(None), "models/gemini-2.5-flash");
        assert_eq!(service.resolve_lm(Some("nope")), "models/gemini-2.5-flash");
    }

    #[test]
    fn resolve_lm_falls_back_to_first_entry() {
        let service = service_with_lm(&[("custom", "models/custom-1")]);
        assert_eq!(service.resolve_lm(None), "models/custom-1");
    }

    #[test]
    fn resolve_lm_empty_catalog_uses_default() {
        let service = service_with_lm(&[]);
        assert_eq!(service.resolve_lm(None), FALLBACK_LM_MODEL);
    }

    #[test]
    fn resolve_stt_found_and_missing() {
        let service = service_with_lm(&[]);
        assert_eq!(
            service.resolve_stt("base").unwrap(),
            ("base".to_owned(), "Systran/faster-whisper-base".to_owned())
        );
        assert!(matches!(
            service.resolve_stt("  "),
            Err(CatalogError::Validation(_))
        ));
        match service.resolve_stt("huge") {
            Err(CatalogError::NotFound { available, .. }) => assert_eq!(available, ["base"]),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_writes_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model_catalog.json");
        let service = CatalogService::open(&path);
        let backend = ListingBackend(Ok(vec![ModelListing::new(
            "gemini-2.5-flash",
            "models/gemini-2.5-flash",
        )]));

        service.refresh(&backend, &DefaultSpeech).await.unwrap();

        let reopened = CatalogService::open(&path);
        let catalog = reopened.snapshot();
        assert_eq!(catalog.lm.len(), 1);
        assert_eq!(catalog.stt.len(), 11);
        assert_eq!(catalog.stt.first().map(|(n, _)| n), Some("tiny"));
    }

    #[tokio::test]
    async fn refresh_falls_back_when_listing_fails() {
        let service = CatalogService::in_memory(ModelCatalog::default());
        service
            .refresh(&ListingBackend(Err(())), &DefaultSpeech)
            .await
            .unwrap();
        let catalog = service.snapshot();
        assert_eq!(catalog.lm, fallback_lm_models());
        assert_eq!(service.resolve_lm(None), "models/gemini-flash-latest");
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_catalog.json");
        std::fs::write(&path, "{not json").unwrap();
        let service = CatalogService::open(&path);
        assert!(service.snapshot().stt.is_empty());
    }
}
