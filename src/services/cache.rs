use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory TTL caches for price quotes and per-address portfolio
/// snapshots. Entries are replaced wholesale on write; readers only ever see
/// a complete entry or nothing.
#[derive(Clone)]
pub struct CacheService {
    prices: Arc<RwLock<HashMap<String, (f64, DateTime<Utc>)>>>,
    portfolios: Arc<RwLock<HashMap<String, SnapshotEntry>>>,
}

/// Snapshot freshness (`expires_at`) and demand (`last_served`) are tracked
/// separately: a stale snapshot is still worth refreshing in the background
/// while someone keeps asking for the address.
struct SnapshotEntry {
    data: Value,
    expires_at: DateTime<Utc>,
    last_served: DateTime<Utc>,
}

impl CacheService {
    pub fn new() -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
            portfolios: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_price(&self, token_id: &str) -> Result<Option<f64>> {
        let prices = self.prices.read().await;

        if let Some((price, expires_at)) = prices.get(token_id) {
            if *expires_at > Utc::now() {
                return Ok(Some(*price));
            }
        }

        Ok(None)
    }

    pub async fn set_price(&self, token_id: &str, price: f64, ttl_seconds: u64) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
        let mut prices = self.prices.write().await;
        prices.insert(token_id.to_string(), (price, expires_at));
        Ok(())
    }

    pub async fn get_portfolio(&self, address: &str) -> Result<Option<Value>> {
        let now = Utc::now();
        let mut portfolios = self.portfolios.write().await;

        if let Some(entry) = portfolios.get_mut(&address.to_lowercase()) {
            entry.last_served = now;
            if entry.expires_at > now {
                return Ok(Some(entry.data.clone()));
            }
        }

        Ok(None)
    }

    pub async fn set_portfolio(&self, address: &str, data: &Value, ttl_seconds: u64) -> Result<()> {
        let now = Utc::now();
        let key = address.to_lowercase();
        let mut portfolios = self.portfolios.write().await;
        // Background rewrites keep the original demand timestamp.
        let last_served = portfolios.get(&key).map(|e| e.last_served).unwrap_or(now);
        portfolios.insert(
            key,
            SnapshotEntry {
                data: data.clone(),
                expires_at: now + chrono::Duration::seconds(ttl_seconds as i64),
                last_served,
            },
        );
        Ok(())
    }

    /// Addresses worth refreshing in the background: anything served within
    /// the retention window. Idle entries are evicted here, so the refresh
    /// set never outgrows the set of recently requested wallets.
    pub async fn cached_addresses(&self, retention_seconds: u64) -> Vec<String> {
        let now = Utc::now();
        let window = chrono::Duration::seconds(retention_seconds as i64);
        let mut portfolios = self.portfolios.write().await;
        portfolios.retain(|_, entry| entry.last_served + window > now);
        portfolios.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_price_is_a_miss() {
        let cache = CacheService::new();
        cache.set_price("ethereum", 1800.0, 0).await.unwrap();
        assert_eq!(cache.get_price("ethereum").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_live_price_round_trips() {
        let cache = CacheService::new();
        cache.set_price("ethereum", 1800.0, 60).await.unwrap();
        assert_eq!(cache.get_price("ethereum").await.unwrap(), Some(1800.0));
    }

    #[tokio::test]
    async fn test_idle_addresses_leave_the_refresh_set() {
        let cache = CacheService::new();
        let snapshot = serde_json::json!({"totalValueUsd": 1.0});
        cache.set_portfolio("0xAAA", &snapshot, 60).await.unwrap();
        cache.set_portfolio("0xBBB", &snapshot, 60).await.unwrap();

        assert_eq!(cache.cached_addresses(60).await.len(), 2);

        // Zero retention: neither address was served inside the window, so
        // both are evicted for good, not just hidden from this listing.
        assert!(cache.cached_addresses(0).await.is_empty());
        assert!(cache.cached_addresses(3600).await.is_empty());
    }

    #[tokio::test]
    async fn test_background_rewrite_keeps_expired_entry_refreshable() {
        let cache = CacheService::new();
        let snapshot = serde_json::json!({"totalValueUsd": 1.0});
        cache.set_portfolio("0xAAA", &snapshot, 0).await.unwrap();

        // Expired for readers, but still in the refresh set while recent.
        assert_eq!(cache.get_portfolio("0xAAA").await.unwrap(), None);
        assert_eq!(cache.cached_addresses(60).await, vec!["0xaaa".to_string()]);
    }
}
