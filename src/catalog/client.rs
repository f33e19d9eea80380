use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;

use super::{CatalogEntry, CatalogResponse, DataType, ReferenceCatalog};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Fetches catalogs from `GET {base}/data/{type}`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    http: Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("civmod/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, data_type: DataType) -> String {
        format!("{}/data/{}", self.base_url, data_type)
    }

    pub async fn fetch(&self, data_type: DataType) -> Result<CatalogResponse> {
        let url = self.url_for(data_type);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch catalog {data_type}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("catalog {data_type} returned {status} from {url}"));
        }

        response
            .json()
            .await
            .with_context(|| format!("failed to parse catalog {data_type}"))
    }

    /// Fetches `data_type` into `catalog`, degrading to an empty list.
    pub async fn load<'a>(
        &self,
        catalog: &'a mut ReferenceCatalog,
        data_type: DataType,
    ) -> &'a [CatalogEntry] {
        let fetched = self.fetch(data_type).await;
        catalog.ingest(data_type, fetched)
    }
}
