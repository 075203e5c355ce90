//! TTL cache in front of an inventory source.
//!
//! The chat turn must never fail because the catalog is unavailable, so
//! `get` swallows source errors (logging them) and hands back an empty list.
//! Failures are not cached: the next access tries again.

use pharmabot_core::inventory::InventorySource;
use pharmabot_core::product::ProductRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

struct CachedInventory {
    fetched_at: Instant,
    products: Arc<Vec<ProductRecord>>,
}

/// Shared, time-bounded product list.
pub struct InventoryCache {
    source: Arc<dyn InventorySource>,
    ttl: Duration,
    state: Mutex<Option<CachedInventory>>,
}

impl InventoryCache {
    pub fn new(source: Arc<dyn InventorySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current product list, refetched when older than the TTL.
    ///
    /// The lock is held across the fetch so concurrent first callers share
    /// one request.
    pub async fn get(&self) -> Arc<Vec<ProductRecord>> {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Arc::clone(&cached.products);
            }
        }

        match self.source.fetch().await {
            Ok(products) => {
                info!(
                    source = self.source.name(),
                    count = products.len(),
                    "Inventory refreshed"
                );
                let products = Arc::new(products);
                *state = Some(CachedInventory {
                    fetched_at: Instant::now(),
                    products: Arc::clone(&products),
                });
                products
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Inventory fetch failed");
                Arc::new(Vec::new())
            }
        }
    }

    /// Drop the cached list; the next `get` refetches.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}
