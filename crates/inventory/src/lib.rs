//! Product inventory for the pharmacy assistant.
//!
//! Sources (`HttpInventorySource`, `FileInventorySource`) may fail;
//! `InventoryCache` sits in front of them and never does.

pub mod cache;
pub mod file;
pub mod http;

pub use cache::InventoryCache;
pub use file::FileInventorySource;
pub use http::HttpInventorySource;

use pharmabot_core::inventory::InventorySource;
use std::sync::Arc;
use std::time::Duration;

/// Pick the source named by config: a local file when set, the endpoint otherwise.
pub fn source_from_config(config: &pharmabot_config::InventoryConfig) -> Arc<dyn InventorySource> {
    match &config.file {
        Some(path) => Arc::new(FileInventorySource::new(path)),
        None => Arc::new(HttpInventorySource::from_config(config)),
    }
}

/// Build a cache over the configured source.
pub fn cache_from_config(config: &pharmabot_config::InventoryConfig) -> InventoryCache {
    InventoryCache::new(
        source_from_config(config),
        Duration::from_secs(config.cache_ttl_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmabot_config::InventoryConfig;

    #[test]
    fn file_setting_selects_file_source() {
        let config = InventoryConfig {
            file: Some("/tmp/products.json".into()),
            ..InventoryConfig::default()
        };
        assert_eq!(source_from_config(&config).name(), "file");
        assert_eq!(source_from_config(&InventoryConfig::default()).name(), "http");
    }

    #[test]
    fn cache_uses_configured_ttl() {
        let cache = cache_from_config(&InventoryConfig::default());
        assert_eq!(cache.ttl(), Duration::from_secs(600));
        assert_eq!(cache.source_name(), "http");
    }
}
