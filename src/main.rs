// src/main.rs
use crate::{
    config::Config,
    routes::{router, AppState},
    services::{
        advisor_api::AdvisorApi,
        balance_service::BalanceService,
        cache::CacheService,
        history_service::{HistoryService, RegistryClient},
        history_store::HistoryStore,
        price_service::PriceService,
    },
};
use std::time::Duration;
use tracing::{info, warn};

// Module declarations
pub mod chains;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod routes;
pub mod services;
pub mod types;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting AI Advisor Gateway");

    // Load configuration
    let config = Config::from_env()?;

    // Initialize services
    let cache = CacheService::new();
    let price_service = PriceService::new(cache.clone(), config.price_cache_ttl_seconds);
    let balances = BalanceService::new(
        price_service.clone(),
        cache.clone(),
        config.balance_poll_seconds,
    );
    let api = AdvisorApi::new(config.advisor_api_url.clone(), config.ipfs_gateway.clone());

    let registry = if config.contract_address.is_empty() {
        warn!("⚠️ ADVISOR_CONTRACT_ADDRESS not set - history will skip the on-chain source");
        None
    } else {
        Some(RegistryClient::new(
            config.contract_rpc_url.clone(),
            config.contract_address.clone(),
        ))
    };
    let history = HistoryService::new(
        registry,
        api.clone(),
        HistoryStore::new(&config.history_cache_dir),
    );

    let state = AppState {
        config: config.clone(),
        api,
        balances: balances.clone(),
        history,
    };

    // Fixed-interval re-poll of every address served recently.
    let poll_balances = balances.clone();
    let poll_seconds = config.balance_poll_seconds;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(poll_seconds.max(5)));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            poll_balances.refresh_known_addresses().await;
        }
    });

    // New-block detection on the primary network forces an early refresh.
    let watch_balances = balances;
    tokio::spawn(async move {
        let chain = &chains::SUPPORTED_CHAINS[0];
        let mut last_block: Option<u64> = None;
        let mut interval = tokio::time::interval(Duration::from_secs(12));
        loop {
            interval.tick().await;
            match services::chain_client::current_block(chain).await {
                Ok(block) => {
                    if last_block.map_or(false, |prev| block > prev) {
                        info!("⛓️ New block {} on {}, refreshing balances", block, chain.key);
                        watch_balances.refresh_known_addresses().await;
                    }
                    last_block = Some(block);
                }
                Err(e) => warn!("block watch failed: {:?}", e),
            }
        }
    });

    let app = router(state);
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    info!("🌐 HTTP server listening on: {}", http_addr);

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            info!("HTTP server stopped: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down gracefully...");
        }
    }

    Ok(())
}
