//! Inventory read from a local JSON export.

use async_trait::async_trait;
use pharmabot_core::error::InventoryError;
use pharmabot_core::inventory::{InventorySource, parse_payload};
use pharmabot_core::product::ProductRecord;
use std::path::{Path, PathBuf};

/// Reads the same payload shape as the endpoint, re-read on every fetch.
pub struct FileInventorySource {
    path: PathBuf,
}

impl FileInventorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InventorySource for FileInventorySource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self) -> Result<Vec<ProductRecord>, InventoryError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| InventoryError::Io {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        parse_payload(&body)
    }
}
