//! Inventory fetched from the store's product endpoint.

use async_trait::async_trait;
use pharmabot_core::error::InventoryError;
use pharmabot_core::inventory::{InventorySource, parse_payload};
use pharmabot_core::product::ProductRecord;
use std::time::Duration;
use tracing::debug;

/// GETs `{"data": [...]}` from a fixed URL.
pub struct HttpInventorySource {
    url: String,
    client: reqwest::Client,
}

impl HttpInventorySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            url: url.into(),
            client,
        }
    }

    pub fn from_config(config: &pharmabot_config::InventoryConfig) -> Self {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Vec<ProductRecord>, InventoryError> {
        debug!(url = %self.url, "Fetching inventory");

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| InventoryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| InventoryError::Network(e.to_string()))?;

        let products = parse_payload(&body)?;
        debug!(count = products.len(), "Inventory fetched");
        Ok(products)
    }
}
