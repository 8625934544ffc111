use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::contract::Contract;
use ethers::providers::{Http, Provider};
use ethers::types::{Address as EthAddress, U256};
use futures::future::join_all;
use tracing::{info, warn};

use crate::services::advisor_api::AdvisorApi;
use crate::services::history_store::HistoryStore;
use crate::types::{BlockchainRequest, IpfsStorageData, RequestDetails};

// Read-only slice of the advisor registry contract.
const REGISTRY_ABI: &str = r#"[
    {
        "inputs": [{"name": "user", "type": "address"}],
        "name": "getUserRequests",
        "outputs": [
            {"name": "requestHashes", "type": "bytes32[]"},
            {"name": "cids", "type": "string[]"},
            {"name": "timestamps", "type": "uint256[]"}
        ],
        "stateMutability": "view",
        "type": "function"
    }
]"#;

/// On-chain history source: getUserRequests on the advisor registry.
#[derive(Clone)]
pub struct RegistryClient {
    rpc_url: String,
    contract_address: String,
}

impl RegistryClient {
    pub fn new(rpc_url: String, contract_address: String) -> Self {
        Self {
            rpc_url,
            contract_address,
        }
    }

    pub async fn get_user_requests(&self, address: &str) -> Result<Vec<BlockchainRequest>> {
        let user: EthAddress = address.parse()?;
        let contract_addr: EthAddress = self.contract_address.parse()?;
        let provider = Provider::<Http>::try_from(self.rpc_url.as_str())?;
        let abi: Abi = serde_json::from_str(REGISTRY_ABI)?;
        let contract = Contract::new(contract_addr, abi, Arc::new(provider));

        let (hashes, cids, timestamps): (Vec<[u8; 32]>, Vec<String>, Vec<U256>) = contract
            .method("getUserRequests", user)?
            .call()
            .await?;

        let requests = hashes
            .into_iter()
            .zip(cids)
            .zip(timestamps)
            .map(|((hash, cid), ts)| BlockchainRequest {
                request_hash: format!("0x{}", hex::encode(hash)),
                cid,
                timestamp: ts.as_u64(),
                details: None,
            })
            .collect();

        Ok(requests)
    }
}

/// Seam for fetching content-addressed documents, so enrichment can be
/// exercised without a live backend.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_document(&self, cid: &str) -> Option<IpfsStorageData>;
}

#[async_trait]
impl ContentStore for AdvisorApi {
    async fn fetch_document(&self, cid: &str) -> Option<IpfsStorageData> {
        self.get_ipfs_data(cid).await
    }
}

/// Picks the highest-priority source that produced data: on-chain read, then
/// the REST endpoint, then the local cache. None means that source errored
/// or returned nothing.
pub fn select_source(
    chain: Option<Vec<BlockchainRequest>>,
    rest: Option<Vec<BlockchainRequest>>,
    cached: Option<Vec<BlockchainRequest>>,
) -> Vec<BlockchainRequest> {
    for source in [chain, rest, cached] {
        if let Some(requests) = source {
            if !requests.is_empty() {
                return requests;
            }
        }
    }
    Vec::new()
}

/// Human-readable detail for one history record.
pub fn details_from_document(doc: &IpfsStorageData) -> RequestDetails {
    let recommendation = doc
        .output
        .allocation_text
        .clone()
        .or_else(|| doc.output.trade_summary.clone())
        .or_else(|| {
            doc.output.allocation.as_ref().map(|allocation| {
                allocation
                    .iter()
                    .map(|item| format!("{}: {}%", item.asset, item.percentage))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        });

    RequestDetails {
        recommendation,
        allocation: doc.output.allocation.clone(),
        trades: doc.output.trades.clone(),
    }
}

/// One concurrent enrichment pass over every record still missing details.
/// Returns how many fetches succeeded; failures stay unenriched.
async fn enrich_once<S: ContentStore + ?Sized>(
    store: &S,
    requests: &mut [BlockchainRequest],
) -> usize {
    let pending: Vec<usize> = requests
        .iter()
        .enumerate()
        .filter(|(_, r)| r.details.is_none())
        .map(|(i, _)| i)
        .collect();

    let fetches = pending.iter().map(|&i| {
        let cid = requests[i].cid.clone();
        async move { (i, store.fetch_document(&cid).await) }
    });

    let mut succeeded = 0;
    for (i, document) in join_all(fetches).await {
        match document {
            Some(doc) => {
                requests[i].details = Some(details_from_document(&doc));
                succeeded += 1;
            }
            None => warn!("no document for cid {}", requests[i].cid),
        }
    }
    succeeded
}

/// Enriches every record, retrying the whole pass a bounded number of times
/// with a fixed delay when *all* fetches fail at once (a backend outage
/// rather than a missing document).
pub async fn enrich<S: ContentStore + ?Sized>(
    store: &S,
    requests: &mut Vec<BlockchainRequest>,
    retry_attempts: u32,
    retry_delay: Duration,
) {
    if requests.is_empty() {
        return;
    }

    let mut attempts_left = retry_attempts;
    loop {
        let pending = requests.iter().filter(|r| r.details.is_none()).count();
        if pending == 0 {
            return;
        }
        let succeeded = enrich_once(store, requests).await;
        if succeeded > 0 || attempts_left == 0 {
            return;
        }
        attempts_left -= 1;
        info!(
            "all {} enrichment fetches failed, retrying ({} attempts left)",
            pending, attempts_left
        );
        tokio::time::sleep(retry_delay).await;
    }
}

#[derive(Clone)]
pub struct HistoryService {
    registry: Option<RegistryClient>,
    api: AdvisorApi,
    store: HistoryStore,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HistoryService {
    pub fn new(registry: Option<RegistryClient>, api: AdvisorApi, store: HistoryStore) -> Self {
        Self {
            registry,
            api,
            store,
            retry_attempts: 2,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Reconciled, enriched advisory history for one wallet, newest first.
    /// Total failure of every source yields an empty list, never an error.
    pub async fn load_history(&self, address: &str) -> Vec<BlockchainRequest> {
        let from_chain = match &self.registry {
            Some(registry) => match registry.get_user_requests(address).await {
                Ok(requests) => Some(requests),
                Err(e) => {
                    warn!("on-chain history read failed for {}: {:?}", address, e);
                    None
                }
            },
            None => None,
        };
        self.reconcile(address, from_chain).await
    }

    /// Fills in the REST and cache sources behind the on-chain result, saves
    /// remote data for offline serving, then enriches.
    async fn reconcile(
        &self,
        address: &str,
        from_chain: Option<Vec<BlockchainRequest>>,
    ) -> Vec<BlockchainRequest> {
        let chain_has_data = matches!(&from_chain, Some(r) if !r.is_empty());

        let from_rest = if chain_has_data {
            None
        } else {
            match self.api.get_user_requests(address).await {
                Ok(requests) => Some(requests),
                Err(e) => {
                    warn!("REST history fetch failed for {}: {}", address, e);
                    None
                }
            }
        };
        let rest_has_data = matches!(&from_rest, Some(r) if !r.is_empty());

        let from_cache = if chain_has_data || rest_has_data {
            None
        } else {
            self.store.load(address)
        };

        let remote = chain_has_data || rest_has_data;
        let mut requests = select_source(from_chain, from_rest, from_cache);
        requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if remote {
            self.store.save(address, &requests);
        }

        enrich(
            &self.api,
            &mut requests,
            self.retry_attempts,
            self.retry_delay,
        )
        .await;

        info!("📜 {} history records for {}", requests.len(), address);
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdvisorRequestInput, AllocationItem, IpfsOutput, RiskLevel};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_store(tag: &str) -> HistoryStore {
        let dir = std::env::temp_dir().join(format!(
            "advisor-gateway-reconcile-test-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        HistoryStore::new(dir)
    }

    fn request(hash: &str, cid: &str, ts: u64) -> BlockchainRequest {
        BlockchainRequest {
            request_hash: hash.to_string(),
            cid: cid.to_string(),
            timestamp: ts,
            details: None,
        }
    }

    fn document(allocation_text: Option<&str>) -> IpfsStorageData {
        IpfsStorageData {
            input: AdvisorRequestInput {
                risk_level: RiskLevel::Medium,
                amount: 10000.0,
                crypto_assets: vec![],
                user_message: None,
            },
            output: IpfsOutput {
                model_version: "v1".to_string(),
                timestamp: 1,
                action: "recommend".to_string(),
                allocation: Some(vec![
                    AllocationItem {
                        asset: "ETH".to_string(),
                        percentage: 60.0,
                        chain: None,
                    },
                    AllocationItem {
                        asset: "USDC".to_string(),
                        percentage: 40.0,
                        chain: None,
                    },
                ]),
                allocation_text: allocation_text.map(|s| s.to_string()),
                trades: None,
                trade_summary: None,
            },
            timestamp: 1,
        }
    }

    struct MapStore {
        documents: HashMap<String, IpfsStorageData>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for MapStore {
        async fn fetch_document(&self, cid: &str) -> Option<IpfsStorageData> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.documents.get(cid).cloned()
        }
    }

    /// Fails every fetch until `fail_fetches` calls have happened.
    struct FlakyStore {
        fail_fetches: usize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for FlakyStore {
        async fn fetch_document(&self, _cid: &str) -> Option<IpfsStorageData> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_fetches {
                None
            } else {
                Some(document(Some("recovered")))
            }
        }
    }

    #[test]
    fn test_chain_source_wins_over_rest() {
        let chain = vec![request("0xchain", "QmC", 10)];
        let rest = vec![request("0xrest", "QmR", 20)];
        let merged = select_source(Some(chain.clone()), Some(rest), None);
        assert_eq!(merged, chain);
    }

    #[test]
    fn test_rest_serves_when_chain_empty_or_erroring() {
        let rest = vec![request("0xrest", "QmR", 20)];
        assert_eq!(
            select_source(Some(vec![]), Some(rest.clone()), None),
            rest
        );
        assert_eq!(select_source(None, Some(rest.clone()), None), rest);
    }

    #[test]
    fn test_cache_is_last_resort_and_total_failure_is_empty() {
        let cached = vec![request("0xcache", "QmL", 5)];
        assert_eq!(select_source(None, None, Some(cached.clone())), cached);
        assert!(select_source(None, None, None).is_empty());
    }

    #[test]
    fn test_details_prefer_allocation_text() {
        let with_text = details_from_document(&document(Some("mostly ETH")));
        assert_eq!(with_text.recommendation.as_deref(), Some("mostly ETH"));

        let joined = details_from_document(&document(None));
        assert_eq!(
            joined.recommendation.as_deref(),
            Some("ETH: 60%, USDC: 40%")
        );
        assert_eq!(joined.allocation.as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_enrichment_failures_are_isolated() {
        let mut documents = HashMap::new();
        documents.insert("QmA".to_string(), document(Some("doc a")));
        documents.insert("QmC".to_string(), document(Some("doc c")));
        let store = MapStore {
            documents,
            fetches: AtomicUsize::new(0),
        };

        let mut requests = vec![
            request("0x01", "QmA", 1),
            request("0x02", "QmMissing", 2),
            request("0x03", "QmC", 3),
        ];
        enrich(&store, &mut requests, 0, Duration::from_millis(1)).await;

        assert_eq!(requests.len(), 3);
        assert!(requests[0].details.is_some());
        assert!(requests[1].details.is_none());
        assert!(requests[2].details.is_some());
    }

    #[tokio::test]
    async fn test_total_enrichment_failure_retries_with_fixed_delay() {
        // First pass (2 fetches) fails entirely; the retry succeeds.
        let store = FlakyStore {
            fail_fetches: 2,
            fetches: AtomicUsize::new(0),
        };
        let mut requests = vec![request("0x01", "QmA", 1), request("0x02", "QmB", 2)];
        enrich(&store, &mut requests, 2, Duration::from_millis(1)).await;

        assert!(requests.iter().all(|r| r.details.is_some()));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let store = FlakyStore {
            fail_fetches: usize::MAX,
            fetches: AtomicUsize::new(0),
        };
        let mut requests = vec![request("0x01", "QmA", 1)];
        enrich(&store, &mut requests, 2, Duration::from_millis(1)).await;

        assert!(requests[0].details.is_none());
        // Initial pass plus two retries.
        assert_eq!(store.fetches.load(Ordering::SeqCst), 3);
    }

    async fn mount_document(server: &MockServer, cid: &str, text: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/ipfs/{}", cid)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": serde_json::to_value(document(Some(text))).unwrap()
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_remote_history_is_cached_for_offline_serving() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history/0xuser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"requestHash": "0xaaa", "cid": "QmA", "timestamp": 100},
                    {"requestHash": "0xbbb", "cid": "QmB", "timestamp": 200}
                ]
            })))
            .mount(&backend)
            .await;
        mount_document(&backend, "QmA", "doc a").await;
        mount_document(&backend, "QmB", "doc b").await;

        let store = temp_store("offline");
        let api = AdvisorApi::new(backend.uri(), backend.uri());
        let service = HistoryService::new(None, api, store.clone());

        let online = service.load_history("0xuser").await;
        assert_eq!(online.len(), 2);
        assert_eq!(online[0].request_hash, "0xbbb"); // newest first
        assert!(online.iter().all(|r| r.details.is_some()));

        // Backend history gone; the saved cache still serves, and the
        // records get enriched again on the way out.
        let degraded = MockServer::start().await;
        mount_document(&degraded, "QmA", "doc a").await;
        mount_document(&degraded, "QmB", "doc b").await;
        let offline_api = AdvisorApi::new(degraded.uri(), degraded.uri());
        let offline = HistoryService::new(None, offline_api, store)
            .load_history("0xuser")
            .await;
        assert_eq!(offline.len(), 2);
        assert_eq!(offline[0].request_hash, "0xbbb");
        assert!(offline.iter().all(|r| r.details.is_some()));
    }

    #[tokio::test]
    async fn test_rest_is_skipped_when_chain_has_records() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history/0xuser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(0)
            .mount(&backend)
            .await;
        mount_document(&backend, "QmC", "from chain").await;

        let api = AdvisorApi::new(backend.uri(), backend.uri());
        let service = HistoryService::new(None, api, temp_store("skiprest"));

        let from_chain = vec![request("0xchain", "QmC", 10)];
        let records = service.reconcile("0xuser", Some(from_chain)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_hash, "0xchain");
        assert_eq!(
            records[0]
                .details
                .as_ref()
                .unwrap()
                .recommendation
                .as_deref(),
            Some("from chain")
        );
    }
}
