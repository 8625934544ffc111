use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use crate::chains::explorer_tx_link;
use crate::config::Config;
use crate::error::ErrorResponse;
use crate::services::advisor_api::AdvisorApi;
use crate::services::balance_service::BalanceService;
use crate::services::history_service::HistoryService;
use crate::types::{
    AdvisorRequestInput, AdvisorResponse, BlockchainRequest, IpfsStorageData, PortfolioSnapshot,
    VerifyResponse,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub api: AdvisorApi,
    pub balances: BalanceService,
    pub history: HistoryService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(health_check))
        .route("/api/portfolio/:address", get(get_portfolio))
        .route("/api/advice", post(post_advice))
        .route("/api/history/:address", get(get_history))
        .route("/api/ipfs/:cid", get(get_ipfs))
        .route("/api/verify/:tx_hash", get(verify_transaction))
        .route("/api/market/data", get(market_data))
        .route("/api/market/fear-greed", get(fear_greed))
        .with_state(state)
}

async fn health_check() -> Json<HashMap<&'static str, &'static str>> {
    let mut response = HashMap::new();
    response.insert("status", "ok");
    response.insert("service", "advisor-gateway");
    Json(response)
}

async fn get_portfolio(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PortfolioSnapshot>, ErrorResponse> {
    if address.parse::<ethers::types::Address>().is_err() {
        return Err(ErrorResponse {
            status: 400,
            message: format!("invalid wallet address: {}", address),
        });
    }

    let snapshot = state.balances.portfolio(&address).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardAdviceRequest {
    user_address: String,
    input: AdvisorRequestInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdviceReply {
    request_hash: String,
    #[serde(flatten)]
    response: AdvisorResponse,
}

async fn post_advice(
    State(state): State<AppState>,
    Json(body): Json<DashboardAdviceRequest>,
) -> Result<Json<AdviceReply>, ErrorResponse> {
    info!("💬 Advice request from {}", body.user_address);
    // The echoed hash is the one that went to the backend, not a recompute.
    let (request_hash, response) = state.api.get_advice(&body.user_address, body.input).await?;
    Ok(Json(AdviceReply {
        request_hash,
        response,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<Vec<BlockchainRequest>> {
    // History degrades all the way down to an empty list; never an error.
    Json(state.history.load_history(&address).await)
}

#[derive(Debug, Serialize)]
struct IpfsReply {
    data: IpfsStorageData,
}

async fn get_ipfs(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<IpfsReply>, ErrorResponse> {
    match state.api.get_ipfs_data(&cid).await {
        Some(data) => Ok(Json(IpfsReply { data })),
        None => Err(ErrorResponse {
            status: 404,
            message: format!("no document found for cid {}", cid),
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReply {
    #[serde(flatten)]
    response: VerifyResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    explorer_link: Option<String>,
}

async fn verify_transaction(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<VerifyReply>, ErrorResponse> {
    let response = state.api.verify_transaction(&tx_hash).await?;
    let explorer_link = response
        .data
        .as_ref()
        .map(|d| explorer_tx_link(&state.config.network_name, &d.hash));
    Ok(Json(VerifyReply {
        response,
        explorer_link,
    }))
}

async fn market_data(
    State(state): State<AppState>,
) -> Result<Json<crate::types::MarketDataResponse>, ErrorResponse> {
    Ok(Json(state.api.get_market_data().await?))
}

async fn fear_greed(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    let response = state.api.get_fear_greed().await?;
    Ok(Json(serde_json::json!({
        "success": response.success,
        "data": response.data,
    })))
}
