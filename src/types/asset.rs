use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Snapshot of one held token's share of total portfolio value.
///
/// Field order matters: the request fingerprint serializes these structs in
/// declaration order and omits `None` fields, matching the dashboard client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAsset {
    pub symbol: String,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorRequestInput {
    pub risk_level: RiskLevel,
    /// Total portfolio value in USD.
    pub amount: f64,
    pub crypto_assets: Vec<CryptoAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    pub asset: String,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeItem {
    pub from_asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_chain: Option<String>,
    pub to_asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_chain: Option<String>,
    pub amount: f64,
    #[serde(rename = "amountInUSD", skip_serializing_if = "Option::is_none")]
    pub amount_in_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of POST /api/advice towards the advisory backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequestBody {
    pub user_address: String,
    pub input: AdvisorRequestInput,
    pub request_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdviceData {
    /// Short recommendation text, or the trade summary when action is "trade".
    pub recommendation: String,
    pub allocation: Vec<AllocationItem>,
    pub cid: String,
    pub tx_hash: String,
    pub signature: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<TradeItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AdviceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Full document pinned to IPFS by the advisory backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IpfsStorageData {
    pub input: AdvisorRequestInput,
    pub output: IpfsOutput,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IpfsOutput {
    pub model_version: String,
    pub timestamp: i64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<AllocationItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<TradeItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_summary: Option<String>,
}

/// One historical advisory request as recorded on chain.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainRequest {
    pub request_hash: String,
    pub cid: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<RequestDetails>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<AllocationItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<TradeItem>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainEvent {
    pub event: String,
    pub address: String,
    pub return_values: Value,
    pub block_number: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionVerification {
    pub hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    pub status: String,
    pub gas_used: u64,
    #[serde(default)]
    pub events: Vec<BlockchainEvent>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TransactionVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FearGreedIndex {
    pub value: i64,
    pub value_classification: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarketTrend {
    pub trend: String,
    pub description: String,
    pub fear_greed_value: i64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EthGasPrice {
    pub low: u64,
    pub average: u64,
    pub high: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarketData {
    #[serde(default)]
    pub fear_greed_index: Option<FearGreedIndex>,
    #[serde(default)]
    pub market_trend: Option<MarketTrend>,
    #[serde(default, alias = "eth_gas_price")]
    pub gas_price: Option<EthGasPrice>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarketDataResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MarketData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
