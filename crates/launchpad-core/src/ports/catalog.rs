//! Remote catalog of installable plugins and templates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CatalogError;

/// One installable item listed in the remote manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "URL")]
    pub url: String,
}

/// The manifest as served: `{"plugins": [...], "templates": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub plugins: Vec<CatalogEntry>,
    #[serde(default)]
    pub templates: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(text).map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.templates.is_empty()
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the current manifest. Returns the raw text alongside the parsed
    /// catalog so callers can cache exactly what was served.
    async fn fetch(&self) -> Result<(Catalog, String), CatalogError>;
}
