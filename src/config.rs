// Configuration loading and settings
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the external advisory backend (POST /api/advice etc.).
    pub advisor_api_url: String,
    /// Public IPFS gateway used when the backend proxy fails.
    pub ipfs_gateway: String,
    /// Advisor registry contract (getUserRequests lives here).
    pub contract_address: String,
    /// RPC endpoint of the network the advisor contract is deployed on.
    pub contract_rpc_url: String,
    /// "mainnet" or "sepolia"; picks the etherscan host for tx links.
    pub network_name: String,
    pub http_port: u16,
    pub price_cache_ttl_seconds: u64,
    pub balance_poll_seconds: u64,
    /// Directory for the best-effort per-wallet history cache files.
    pub history_cache_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            advisor_api_url: env::var("ADVISOR_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            ipfs_gateway: env::var("IPFS_GATEWAY")
                .unwrap_or_else(|_| "https://ipfs.io/ipfs".to_string()),
            contract_address: env::var("ADVISOR_CONTRACT_ADDRESS").unwrap_or_default(),
            contract_rpc_url: env::var("CONTRACT_RPC_URL")
                .unwrap_or_else(|_| "https://eth.llamarpc.com".to_string()),
            network_name: env::var("NETWORK_NAME").unwrap_or_else(|_| "mainnet".to_string()),
            http_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            price_cache_ttl_seconds: env::var("PRICE_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            balance_poll_seconds: env::var("BALANCE_POLL_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            history_cache_dir: env::var("HISTORY_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("advisor-gateway-history")),
        })
    }
}
