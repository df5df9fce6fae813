//! HTTP catalog source.

use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::{Catalog, CatalogError, CatalogSource};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the plugin and template manifest with a plain GET.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("launchpad/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<(Catalog, String), CatalogError> {
        debug!(url = %self.url, "fetching catalog");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let text = response
            .text()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;
        let catalog = Catalog::from_json(&text)?;
        debug!(
            plugins = catalog.plugins.len(),
            templates = catalog.templates.len(),
            "catalog fetched"
        );
        Ok((catalog, text))
    }
}
