use anyhow::Result;
use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address as EthAddress, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::chains::{tokens_for_chain, ChainConfig, ERC20_ABI};
use crate::services::price_service::PriceService;
use crate::types::TokenBalance;

/// Latest block number on a network; the poller uses this to spot on-chain
/// activity between refresh intervals.
pub async fn current_block(chain: &ChainConfig) -> Result<u64> {
    let provider = Provider::<Http>::try_from(chain.rpc_url)?;
    Ok(provider.get_block_number().await?.as_u64())
}

/// Read-only client for one EVM network out of the registry. Every chain
/// goes through this same routine; there are no per-network fetchers.
#[derive(Clone)]
pub struct EvmClient {
    chain: &'static ChainConfig,
    price_service: PriceService,
}

impl EvmClient {
    pub fn new(chain: &'static ChainConfig, price_service: PriceService) -> Self {
        Self {
            chain,
            price_service,
        }
    }

    /// Native balance plus every registry token with a non-zero balance,
    /// valued in USD.
    pub async fn fetch_balances(&self, address: &str) -> Result<Vec<TokenBalance>> {
        info!("🔍 Fetching {} balances for {}", self.chain.key, address);

        let addr: EthAddress = address.parse()?;
        let provider = Provider::<Http>::try_from(self.chain.rpc_url)?;

        let mut balances = Vec::new();

        // Native currency
        let raw = provider.get_balance(addr, None).await?;
        let native_amount = raw.as_u128() as f64 / 10_f64.powi(self.chain.native.decimals as i32);
        if native_amount > 0.0 {
            let price = self
                .price_service
                .get_usd_price(
                    self.chain.native.coingecko_id,
                    self.chain.native.reference_price,
                )
                .await;
            balances.push(TokenBalance {
                symbol: self.chain.native.symbol.to_string(),
                chain: self.chain.key.to_string(),
                address: "native".to_string(),
                amount: native_amount,
                decimals: self.chain.native.decimals,
                price_usd: price,
                value_usd: native_amount * price,
            });
        }

        // ERC-20 tokens
        let provider = Arc::new(provider);
        for token in tokens_for_chain(self.chain.key) {
            match self.token_balance(&provider, &addr, token.address, token.decimals).await {
                Ok(amount) if amount > 0.0 => {
                    let price = self
                        .price_service
                        .get_usd_price(token.coingecko_id, token.reference_price)
                        .await;
                    info!("💰 {} {} on {}", amount, token.symbol, self.chain.key);
                    balances.push(TokenBalance {
                        symbol: token.symbol.to_string(),
                        chain: self.chain.key.to_string(),
                        address: token.address.to_string(),
                        amount,
                        decimals: token.decimals,
                        price_usd: price,
                        value_usd: amount * price,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        "⚠️ balanceOf failed for {} on {}: {:?}",
                        token.symbol, self.chain.key, e
                    );
                }
            }
        }

        info!(
            "📦 {} holdings with balance > 0 on {}",
            balances.len(),
            self.chain.key
        );
        Ok(balances)
    }

    async fn token_balance(
        &self,
        provider: &Arc<Provider<Http>>,
        owner: &EthAddress,
        token_address: &str,
        decimals: u8,
    ) -> Result<f64> {
        let token_addr: EthAddress = token_address.parse()?;
        let abi: Abi = serde_json::from_str(ERC20_ABI)?;
        let contract = Contract::new(token_addr, abi, Arc::clone(provider));

        let balance: U256 = contract
            .method::<_, U256>("balanceOf", *owner)?
            .call()
            .await?;

        Ok(balance.as_u128() as f64 / 10_f64.powi(decimals as i32))
    }
}
