use anyhow::Result;
use futures::future::join_all;
use tracing::{error, info};

use crate::chains::SUPPORTED_CHAINS;
use crate::services::cache::CacheService;
use crate::services::chain_client::EvmClient;
use crate::services::price_service::PriceService;
use crate::types::{CryptoAsset, PortfolioSnapshot, TokenBalance};

/// How long an address stays in the background-refresh set after it was
/// last requested. Keeps the per-tick RPC fan-out bounded by recent demand.
const REFRESH_RETENTION_SECONDS: u64 = 600;

/// Asset list used when a wallet holds nothing we can see, so advisory
/// requests always carry a non-empty distribution.
pub fn fallback_allocation() -> Vec<CryptoAsset> {
    vec![
        CryptoAsset {
            symbol: "ETH".to_string(),
            percentage: 50.0,
            chain: Some("ethereum".to_string()),
            amount: None,
            price: None,
        },
        CryptoAsset {
            symbol: "USDC".to_string(),
            percentage: 30.0,
            chain: Some("ethereum".to_string()),
            amount: None,
            price: None,
        },
        CryptoAsset {
            symbol: "USDT".to_string(),
            percentage: 20.0,
            chain: Some("ethereum".to_string()),
            amount: None,
            price: None,
        },
    ]
}

/// Value-weighted integer percentages over the non-zero holdings. The
/// rounding residual lands on the largest holding so the sum is exactly 100.
pub fn allocation_from_balances(balances: &[TokenBalance]) -> Vec<CryptoAsset> {
    let held: Vec<&TokenBalance> = balances.iter().filter(|b| b.value_usd > 0.0).collect();
    let total: f64 = held.iter().map(|b| b.value_usd).sum();
    if held.is_empty() || total <= 0.0 {
        return fallback_allocation();
    }

    let mut assets: Vec<CryptoAsset> = held
        .iter()
        .map(|b| CryptoAsset {
            symbol: b.symbol.clone(),
            percentage: (b.value_usd / total * 100.0).round(),
            chain: Some(b.chain.clone()),
            amount: Some(b.amount),
            price: Some(b.price_usd),
        })
        .collect();

    let sum: f64 = assets.iter().map(|a| a.percentage).sum();
    let residual = 100.0 - sum;
    if residual != 0.0 {
        let largest = held
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.value_usd
                    .partial_cmp(&b.value_usd)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0);
        assets[largest].percentage += residual;
    }

    assets
}

#[derive(Clone)]
pub struct BalanceService {
    price_service: PriceService,
    cache: CacheService,
    snapshot_ttl_seconds: u64,
}

impl BalanceService {
    pub fn new(price_service: PriceService, cache: CacheService, snapshot_ttl_seconds: u64) -> Self {
        Self {
            price_service,
            cache,
            snapshot_ttl_seconds,
        }
    }

    /// Cached snapshot if fresh, otherwise a full multi-chain refresh.
    pub async fn portfolio(&self, address: &str) -> Result<PortfolioSnapshot> {
        if let Ok(Some(cached)) = self.cache.get_portfolio(address).await {
            if let Ok(snapshot) = serde_json::from_value::<PortfolioSnapshot>(cached) {
                return Ok(snapshot);
            }
        }
        self.refresh_portfolio(address).await
    }

    /// Reads every configured network concurrently. A failing chain
    /// contributes nothing and is reported in `failed_chains`; the snapshot
    /// itself always renders.
    pub async fn refresh_portfolio(&self, address: &str) -> Result<PortfolioSnapshot> {
        // Address validity is the one thing we cannot degrade around.
        let _: ethers::types::Address = address.parse()?;

        let fetches = SUPPORTED_CHAINS.iter().map(|chain| {
            let client = EvmClient::new(chain, self.price_service.clone());
            let address = address.to_string();
            async move { (chain.key, client.fetch_balances(&address).await) }
        });

        let mut balances: Vec<TokenBalance> = Vec::new();
        let mut failed_chains: Vec<String> = Vec::new();
        for (chain_key, result) in join_all(fetches).await {
            match result {
                Ok(mut chain_balances) => balances.append(&mut chain_balances),
                Err(e) => {
                    error!("❌ balance read failed on {}: {:?}", chain_key, e);
                    failed_chains.push(chain_key.to_string());
                }
            }
        }

        let total_value_usd: f64 = balances.iter().map(|b| b.value_usd).sum();
        let snapshot = PortfolioSnapshot {
            address: address.to_string(),
            total_value_usd,
            allocation: allocation_from_balances(&balances),
            balances,
            failed_chains,
            last_updated: chrono::Utc::now().to_rfc3339(),
        };

        info!(
            "📊 Portfolio for {}: ${:.2} across {} holdings ({} chains failed)",
            address,
            snapshot.total_value_usd,
            snapshot.balances.len(),
            snapshot.failed_chains.len()
        );

        if let Ok(value) = serde_json::to_value(&snapshot) {
            let _ = self
                .cache
                .set_portfolio(address, &value, self.snapshot_ttl_seconds)
                .await;
        }

        Ok(snapshot)
    }

    /// Re-polls every address served within the retention window. Driven by
    /// the fixed interval task and by new-block detection in main.
    pub async fn refresh_known_addresses(&self) {
        for address in self.cache.cached_addresses(REFRESH_RETENTION_SECONDS).await {
            if let Err(e) = self.refresh_portfolio(&address).await {
                error!("background refresh failed for {}: {:?}", address, e);
            }
        }
    }
}
