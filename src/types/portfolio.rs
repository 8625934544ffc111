use serde::{Deserialize, Serialize};

use crate::types::asset::CryptoAsset;

/// One (chain, token) balance with its USD valuation. `address` is the token
/// contract, or "native" for the chain's base currency.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub symbol: String,
    pub chain: String,
    pub address: String,
    pub amount: f64,
    pub decimals: u8,
    pub price_usd: f64,
    pub value_usd: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub address: String,
    pub total_value_usd: f64,
    pub balances: Vec<TokenBalance>,
    /// Normalized percentage distribution; sums to exactly 100.
    pub allocation: Vec<CryptoAsset>,
    /// Chains whose reads failed this round; clients may offer a retry.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_chains: Vec<String>,
    pub last_updated: String,
}
