use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::chains::ipfs_link;
use crate::fingerprint::request_hash;
use crate::types::{
    AdviceRequestBody, AdvisorRequestInput, AdvisorResponse, BlockchainRequest, FearGreedIndex,
    IpfsStorageData, MarketDataResponse, VerifyResponse,
};

/// Errors from the advisory backend. Nothing here is fatal: handlers map
/// these onto a degraded response with the original status code attached.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("advisory backend returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        error_code: Option<String>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Api { status, .. } => *status,
            ApiError::Network(_) => 502,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
pub struct FearGreedResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<FearGreedIndex>,
}

/// HTTP client for the external advisory backend, plus the public IPFS
/// gateway fallback for content-addressed documents.
#[derive(Clone)]
pub struct AdvisorApi {
    http: reqwest::Client,
    base_url: String,
    ipfs_gateway: String,
}

impl AdvisorApi {
    pub fn new(base_url: String, ipfs_gateway: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ipfs_gateway: ipfs_gateway.trim_end_matches('/').to_string(),
        }
    }

    /// Fingerprints the request and forwards it to POST /api/advice. The
    /// hash is computed once and returned with the response, so backend,
    /// contract, and dashboard all refer to the same opaque request id.
    pub async fn get_advice(
        &self,
        user_address: &str,
        input: AdvisorRequestInput,
    ) -> Result<(String, AdvisorResponse), ApiError> {
        let body = AdviceRequestBody {
            user_address: user_address.to_string(),
            request_hash: request_hash(&input),
            input,
        };
        info!("📡 Requesting advice for {} ({})", user_address, body.request_hash);

        let response = self
            .http
            .post(format!("{}/api/advice", self.base_url))
            .json(&body)
            .send()
            .await?;

        Ok((body.request_hash, Self::parse_json(response).await?))
    }

    /// Content-addressed document for a request. Tries the backend proxy
    /// first, then the public gateway; None means both paths failed and the
    /// caller should treat this record as unenriched.
    pub async fn get_ipfs_data(&self, cid: &str) -> Option<IpfsStorageData> {
        match self
            .http
            .get(format!("{}/api/ipfs/{}", self.base_url, cid))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                if let Ok(envelope) = response.json::<DataEnvelope<IpfsStorageData>>().await {
                    return Some(envelope.data);
                }
            }
            Ok(response) => {
                warn!("backend IPFS proxy returned {} for {}", response.status(), cid);
            }
            Err(e) => warn!("backend IPFS proxy failed for {}: {}", cid, e),
        }

        // Gateway serves the raw document without the data envelope.
        match self
            .http
            .get(ipfs_link(&self.ipfs_gateway, cid))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                response.json::<IpfsStorageData>().await.ok()
            }
            Ok(response) => {
                warn!("IPFS gateway returned {} for {}", response.status(), cid);
                None
            }
            Err(e) => {
                warn!("IPFS gateway failed for {}: {}", cid, e);
                None
            }
        }
    }

    pub async fn verify_transaction(&self, tx_hash: &str) -> Result<VerifyResponse, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/verify/{}", self.base_url, tx_hash))
            .send()
            .await?;
        Self::parse_json(response).await
    }

    /// REST history source, used when the on-chain read comes back empty.
    pub async fn get_user_requests(
        &self,
        address: &str,
    ) -> Result<Vec<BlockchainRequest>, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/history/{}", self.base_url, address))
            .send()
            .await?;
        let envelope: DataEnvelope<Vec<BlockchainRequest>> = Self::parse_json(response).await?;
        Ok(envelope.data)
    }

    pub async fn get_market_data(&self) -> Result<MarketDataResponse, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/market/data", self.base_url))
            .send()
            .await?;
        Self::parse_json(response).await
    }

    pub async fn get_fear_greed(&self) -> Result<FearGreedResponse, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/market/fear-greed", self.base_url))
            .send()
            .await?;
        Self::parse_json(response).await
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("detail")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .to_string();
            let error_code = body
                .get("error")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
                error_code,
            });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CryptoAsset, RiskLevel};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_input() -> AdvisorRequestInput {
        AdvisorRequestInput {
            risk_level: RiskLevel::Medium,
            amount: 10000.0,
            crypto_assets: vec![CryptoAsset {
                symbol: "ETH".to_string(),
                percentage: 100.0,
                chain: None,
                amount: None,
                price: None,
            }],
            user_message: None,
        }
    }

    #[tokio::test]
    async fn test_get_advice_posts_fingerprint() {
        let server = MockServer::start().await;
        let expected_hash = request_hash(&sample_input());
        Mock::given(method("POST"))
            .and(path("/api/advice"))
            .and(body_string_contains(expected_hash.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "action": "recommend",
                "data": {
                    "recommendation": "Hold ETH",
                    "allocation": [{"asset": "ETH", "percentage": 100}],
                    "cid": "QmTest",
                    "txHash": "0xdead",
                    "signature": "0xsig",
                    "timestamp": 1700000000
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = AdvisorApi::new(server.uri(), "https://ipfs.io/ipfs".to_string());
        let (hash, response) = api.get_advice("0xuser", sample_input()).await.unwrap();
        // The echoed hash is the exact one the forwarded body carried.
        assert_eq!(hash, expected_hash);
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data.cid, "QmTest");
        assert_eq!(data.allocation[0].asset, "ETH");
    }

    #[tokio::test]
    async fn test_backend_error_carries_status_and_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/advice"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "detail": "model overloaded",
                "error": "MODEL_BUSY"
            })))
            .mount(&server)
            .await;

        let api = AdvisorApi::new(server.uri(), "https://ipfs.io/ipfs".to_string());
        let err = api.get_advice("0xuser", sample_input()).await.unwrap_err();
        match err {
            ApiError::Api {
                status,
                message,
                error_code,
            } => {
                assert_eq!(status, 503);
                assert_eq!(message, "model overloaded");
                assert_eq!(error_code.as_deref(), Some("MODEL_BUSY"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ipfs_falls_back_to_gateway() {
        let backend = MockServer::start().await;
        let gateway = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/ipfs/QmTest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/QmTest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "input": {
                    "riskLevel": "medium",
                    "amount": 10000,
                    "cryptoAssets": []
                },
                "output": {
                    "modelVersion": "v1",
                    "timestamp": 1700000000,
                    "action": "recommend",
                    "allocation": [{"asset": "ETH", "percentage": 100}]
                },
                "timestamp": 1700000000
            })))
            .mount(&gateway)
            .await;

        let api = AdvisorApi::new(backend.uri(), gateway.uri());
        let doc = api.get_ipfs_data("QmTest").await.unwrap();
        assert_eq!(doc.output.action, "recommend");
        assert_eq!(doc.output.allocation.unwrap()[0].percentage, 100.0);
    }

    #[tokio::test]
    async fn test_ipfs_total_failure_is_none() {
        let backend = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&backend)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&gateway)
            .await;

        let api = AdvisorApi::new(backend.uri(), gateway.uri());
        assert!(api.get_ipfs_data("QmMissing").await.is_none());
    }

    #[tokio::test]
    async fn test_history_endpoint_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history/0xuser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"requestHash": "0xaaa", "cid": "QmA", "timestamp": 1700000000},
                    {"requestHash": "0xbbb", "cid": "QmB", "timestamp": 1700000100}
                ]
            })))
            .mount(&server)
            .await;

        let api = AdvisorApi::new(server.uri(), "https://ipfs.io/ipfs".to_string());
        let history = api.get_user_requests("0xuser").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].cid, "QmB");
    }
}
