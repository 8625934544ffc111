use anyhow::Result;
use tracing::{debug, warn};

use crate::services::cache::CacheService;

#[derive(Clone)]
pub struct PriceService {
    cache: CacheService,
    ttl_seconds: u64,
}

impl PriceService {
    pub fn new(cache: CacheService, ttl_seconds: u64) -> Self {
        Self { cache, ttl_seconds }
    }

    /// USD price for a CoinGecko id, falling back to the registry's
    /// reference price when the id is unknown or the quote API is down.
    /// Quotes are cached with a fixed TTL and refreshed opportunistically.
    pub async fn get_usd_price(
        &self,
        coingecko_id: Option<&str>,
        reference_price: f64,
    ) -> f64 {
        let Some(id) = coingecko_id else {
            return reference_price;
        };

        match self.cache.get_price(id).await {
            Ok(Some(price)) => return price,
            Ok(None) => {}
            Err(e) => warn!("price cache read failed for {}: {}", id, e),
        }

        match self.fetch_coingecko_price(id).await {
            Ok(price) => {
                if let Err(e) = self.cache.set_price(id, price, self.ttl_seconds).await {
                    warn!("price cache write failed for {}: {}", id, e);
                }
                price
            }
            Err(e) => {
                debug!("live price fetch failed for {}: {}, using reference", id, e);
                reference_price
            }
        }
    }

    async fn fetch_coingecko_price(&self, coingecko_id: &str) -> Result<f64> {
        let api_key = std::env::var("COINGECKO_API_KEY").ok();
        let url = if let Some(key) = api_key {
            format!(
                "https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies=usd&x_cg_demo_api_key={}",
                coingecko_id, key
            )
        } else {
            format!(
                "https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies=usd",
                coingecko_id
            )
        };

        let response: serde_json::Value = reqwest::get(&url).await?.json().await?;

        response[coingecko_id]["usd"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("no usd quote for {}", coingecko_id))
    }
}
