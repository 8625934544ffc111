// Supported networks and token lists. The registry is immutable: live prices
// come from the price service, never from mutating these tables.

#[derive(Debug, Clone, Copy)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    /// Reference price used when no live quote is available.
    pub reference_price: f64,
    pub coingecko_id: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChainConfig {
    pub id: u64,
    pub name: &'static str,
    pub key: &'static str,
    pub rpc_url: &'static str,
    pub block_explorer: &'static str,
    pub native: NativeCurrency,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub decimals: u8,
    pub chain_key: &'static str,
    pub reference_price: f64,
    pub coingecko_id: Option<&'static str>,
}

pub const SUPPORTED_CHAINS: &[ChainConfig] = &[
    ChainConfig {
        id: 1,
        name: "Ethereum Mainnet",
        key: "ethereum",
        rpc_url: "https://eth.llamarpc.com",
        block_explorer: "https://etherscan.io",
        native: NativeCurrency {
            name: "Ethereum",
            symbol: "ETH",
            decimals: 18,
            reference_price: 1800.0,
            coingecko_id: Some("ethereum"),
        },
    },
    ChainConfig {
        id: 56,
        name: "BNB Smart Chain",
        key: "bsc",
        rpc_url: "https://bsc-dataseed.binance.org",
        block_explorer: "https://bscscan.com",
        native: NativeCurrency {
            name: "BNB",
            symbol: "BNB",
            decimals: 18,
            reference_price: 220.0,
            coingecko_id: Some("binancecoin"),
        },
    },
    ChainConfig {
        id: 137,
        name: "Polygon",
        key: "polygon",
        rpc_url: "https://polygon-rpc.com",
        block_explorer: "https://polygonscan.com",
        native: NativeCurrency {
            name: "Polygon",
            symbol: "POL",
            decimals: 18,
            reference_price: 0.7,
            coingecko_id: Some("matic-network"),
        },
    },
    ChainConfig {
        id: 42161,
        name: "Arbitrum One",
        key: "arbitrum",
        rpc_url: "https://arb1.arbitrum.io/rpc",
        block_explorer: "https://arbiscan.io",
        native: NativeCurrency {
            name: "Ethereum",
            symbol: "ETH",
            decimals: 18,
            reference_price: 1800.0,
            coingecko_id: Some("ethereum"),
        },
    },
    ChainConfig {
        id: 5000,
        name: "Mantle",
        key: "mantle",
        rpc_url: "https://rpc.mantle.xyz",
        block_explorer: "https://explorer.mantle.xyz",
        native: NativeCurrency {
            name: "Mantle",
            symbol: "MNT",
            decimals: 18,
            reference_price: 0.5,
            coingecko_id: Some("mantle"),
        },
    },
];

pub const SUPPORTED_TOKENS: &[TokenInfo] = &[
    // Ethereum
    TokenInfo { symbol: "WETH", name: "Wrapped Ethereum", address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", decimals: 18, chain_key: "ethereum", reference_price: 1800.0, coingecko_id: Some("ethereum") },
    TokenInfo { symbol: "USDT", name: "Tether USD", address: "0xdAC17F958D2ee523a2206206994597C13D831ec7", decimals: 6, chain_key: "ethereum", reference_price: 1.0, coingecko_id: Some("tether") },
    TokenInfo { symbol: "USDC", name: "USD Coin", address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", decimals: 6, chain_key: "ethereum", reference_price: 1.0, coingecko_id: Some("usd-coin") },
    TokenInfo { symbol: "DAI", name: "Dai Stablecoin", address: "0x6B175474E89094C44Da98b954EedeAC495271d0F", decimals: 18, chain_key: "ethereum", reference_price: 1.0, coingecko_id: Some("dai") },
    // BSC
    TokenInfo { symbol: "WBNB", name: "Wrapped BNB", address: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", decimals: 18, chain_key: "bsc", reference_price: 220.0, coingecko_id: Some("binancecoin") },
    TokenInfo { symbol: "USDT", name: "Binance-Peg BSC-USD", address: "0x55d398326f99059fF775485246999027B3197955", decimals: 18, chain_key: "bsc", reference_price: 1.0, coingecko_id: Some("tether") },
    TokenInfo { symbol: "BUSD", name: "Binance USD", address: "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56", decimals: 18, chain_key: "bsc", reference_price: 1.0, coingecko_id: None },
    TokenInfo { symbol: "CAKE", name: "PancakeSwap Token", address: "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82", decimals: 18, chain_key: "bsc", reference_price: 2.0, coingecko_id: Some("pancakeswap-token") },
    // Polygon
    TokenInfo { symbol: "WPOL", name: "Wrapped Polygon", address: "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", decimals: 18, chain_key: "polygon", reference_price: 0.7, coingecko_id: Some("matic-network") },
    TokenInfo { symbol: "USDT", name: "Tether USD", address: "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", decimals: 6, chain_key: "polygon", reference_price: 1.0, coingecko_id: Some("tether") },
    TokenInfo { symbol: "USDC", name: "USD Coin", address: "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", decimals: 6, chain_key: "polygon", reference_price: 1.0, coingecko_id: Some("usd-coin") },
    TokenInfo { symbol: "USDC.e", name: "USD Coin (PoS)", address: "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", decimals: 6, chain_key: "polygon", reference_price: 1.0, coingecko_id: Some("usd-coin") },
    TokenInfo { symbol: "POL", name: "POL Token", address: "0x0000000000000000000000000000000000001010", decimals: 18, chain_key: "polygon", reference_price: 0.7, coingecko_id: Some("matic-network") },
    // Arbitrum
    TokenInfo { symbol: "WETH", name: "Wrapped Ethereum", address: "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", decimals: 18, chain_key: "arbitrum", reference_price: 1800.0, coingecko_id: Some("ethereum") },
    TokenInfo { symbol: "USDT", name: "Tether USD", address: "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", decimals: 6, chain_key: "arbitrum", reference_price: 1.0, coingecko_id: Some("tether") },
    TokenInfo { symbol: "USDC", name: "USD Coin", address: "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8", decimals: 6, chain_key: "arbitrum", reference_price: 1.0, coingecko_id: Some("usd-coin") },
    TokenInfo { symbol: "ARB", name: "Arbitrum", address: "0x912CE59144191C1204E64559FE8253a0e49E6548", decimals: 18, chain_key: "arbitrum", reference_price: 1.2, coingecko_id: Some("arbitrum") },
    // Mantle
    TokenInfo { symbol: "WMNT", name: "Wrapped Mantle", address: "0x78c1b0C915c4FAA5FffA6CAbf0219DA63d7f4cb8", decimals: 18, chain_key: "mantle", reference_price: 0.5, coingecko_id: Some("mantle") },
    TokenInfo { symbol: "USDT", name: "Tether USD", address: "0x201EBa5CC46D216Ce6DC03F6a759e8E766e956aE", decimals: 6, chain_key: "mantle", reference_price: 1.0, coingecko_id: Some("tether") },
    TokenInfo { symbol: "USDC", name: "USD Coin", address: "0x09Bc4E0D864854c6aFB6eB9A9cdF58aC190D0dF9", decimals: 6, chain_key: "mantle", reference_price: 1.0, coingecko_id: Some("usd-coin") },
    TokenInfo { symbol: "MNT", name: "Mantle", address: "0x3c3a81e81dc49A522A592e7622A7E711c06bf354", decimals: 18, chain_key: "mantle", reference_price: 0.5, coingecko_id: Some("mantle") },
];

// Minimal ERC-20 read ABI shared by every chain client.
pub const ERC20_ABI: &str = r#"[
    {
        "constant": true,
        "inputs": [{"name": "_owner", "type": "address"}],
        "name": "balanceOf",
        "outputs": [{"name": "balance", "type": "uint256"}],
        "type": "function"
    },
    {
        "constant": true,
        "inputs": [],
        "name": "decimals",
        "outputs": [{"name": "", "type": "uint8"}],
        "type": "function"
    },
    {
        "constant": true,
        "inputs": [],
        "name": "symbol",
        "outputs": [{"name": "", "type": "string"}],
        "type": "function"
    }
]"#;

pub fn chain_by_key(key: &str) -> Option<&'static ChainConfig> {
    SUPPORTED_CHAINS.iter().find(|c| c.key == key)
}

pub fn tokens_for_chain(key: &str) -> impl Iterator<Item = &'static TokenInfo> + '_ {
    SUPPORTED_TOKENS.iter().filter(move |t| t.chain_key == key)
}

/// Transaction link on the named network's block explorer. Networks outside
/// the registry (the advisor contract runs on sepolia or mainnet) fall back
/// to etherscan.
pub fn explorer_tx_link(network_name: &str, tx_hash: &str) -> String {
    let base = match chain_by_key(network_name) {
        Some(chain) => chain.block_explorer,
        None if network_name == "sepolia" => "https://sepolia.etherscan.io",
        None => "https://etherscan.io",
    };
    format!("{}/tx/{}", base, tx_hash)
}

pub fn ipfs_link(gateway: &str, cid: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), cid)
}
