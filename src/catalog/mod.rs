//! Model catalog: which STT and LM models clients may request.
//!
//! The catalog file keeps two ordered sections:
//!
//! ```json
//! {
//!   "STT": { "base": "Systran/faster-whisper-base" },
//!   "LM":  { "gemini-2.5-flash": "models/gemini-2.5-flash" }
//! }
//! ```
//!
//! It is regenerated from the backends at startup and read by the HTTP layer
//! through [`CatalogService`].

mod error;
mod service;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use error::{CatalogError, Result};
pub use service::{CatalogService, FALLBACK_LM_MODEL, fallback_lm_models};

/// An insertion-ordered `name → identifier` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSection(Vec<(String, String)>);

impl CatalogSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        let name = name.into();
        let id = id.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = id,
            None => self.0.push((name, id)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn first(&self) -> Option<(&str, &str)> {
        self.0.first().map(|(n, id)| (n.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for CatalogSection {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut section = Self::new();
        for (name, id) in iter {
            section.insert(name, id);
        }
        section
    }
}

impl Serialize for CatalogSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(n, id)| (n, id)))
    }
}

impl<'de> Deserialize<'de> for CatalogSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = CatalogSection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of model names to identifiers")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut section = CatalogSection::new();
                while let Some((name, id)) = map.next_entry::<String, String>()? {
                    section.insert(name, id);
                }
                Ok(section)
            }
        }

        deserializer.deserialize_map(SectionVisitor)
    }
}

/// The persisted catalog document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(rename = "STT", default)]
    pub stt: CatalogSection,
    #[serde(rename = "LM", default)]
    pub lm: CatalogSection,
}

/// One model as shown to client apps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub display_name: String,
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CatalogEntry {
    fn enabled(display_name: &str, kind: &str) -> Self {
        Self {
            display_name: display_name.to_owned(),
            enabled: true,
            kind: kind.to_owned(),
        }
    }
}

/// Client-facing catalog returned by `GET /catalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCatalog {
    pub stt_models: Vec<CatalogEntry>,
    pub lm_models: Vec<CatalogEntry>,
}

impl ModelCatalog {
    /// Display view: every STT model, and LM models whose name starts with `gemini`.
    pub fn app_view(&self) -> AppCatalog {
        AppCatalog {
            stt_models: self
                .stt
                .names()
                .map(|n| CatalogEntry::enabled(n, "stt"))
                .collect(),
            lm_models: self
                .lm
                .names()
                .filter(|n| n.starts_with("gemini"))
                .map(|n| CatalogEntry::enabled(n, "lm"))
                .collect(),
        }
    }
}
