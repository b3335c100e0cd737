//! Endpoint liveness polling.

use std::time::Instant;

use futures::future;
use serde::Serialize;
use tracing::debug;

use crate::registry::Endpoint;
use crate::rpc::RpcClient;

/// Live health snapshot of one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub id: String,
    pub name: String,
    pub url: String,
    pub symbol: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    pub latency_ms: i64,
}

/// Probe one endpoint with `eth_chainId` and `eth_blockNumber`.
///
/// The chain ID call decides online/offline and the latency covers the
/// whole probe. A failing block number alone leaves the endpoint
/// online, just without that field; chains behind strict proxies do
/// this in practice.
pub async fn poll(client: &RpcClient, endpoint: &Endpoint) -> EndpointStatus {
    let mut status = EndpointStatus {
        id: endpoint.id.clone(),
        name: endpoint.name.clone(),
        url: endpoint.url.clone(),
        symbol: endpoint.symbol.clone(),
        online: false,
        chain_id: None,
        block_number: None,
        latency_ms: 0,
    };

    let start = Instant::now();

    match client.chain_id(&endpoint.url).await {
        Ok(chain_id) => status.chain_id = Some(chain_id),
        Err(e) => {
            status.latency_ms = start.elapsed().as_millis() as i64;
            debug!(endpoint = %endpoint.id, error = %e, "Endpoint offline");
            return status;
        }
    }

    match client.block_number(&endpoint.url).await {
        Ok(number) => status.block_number = Some(number),
        Err(e) => debug!(endpoint = %endpoint.id, error = %e, "Block number probe failed"),
    }

    status.online = true;
    status.latency_ms = start.elapsed().as_millis() as i64;
    status
}

/// Probe all endpoints concurrently, preserving input order.
pub async fn poll_all(client: &RpcClient, endpoints: &[Endpoint]) -> Vec<EndpointStatus> {
    future::join_all(endpoints.iter().map(|ep| poll(client, ep))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_reports_unreachable_endpoint_offline() {
        // Bind and immediately release a loopback port so nothing is
        // listening on it when the probe runs.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint {
            id: "dead".to_string(),
            name: "Dead".to_string(),
            url: format!("http://127.0.0.1:{}", port),
            symbol: "ETH".to_string(),
        };

        let status = poll(&RpcClient::new(), &endpoint).await;

        assert!(!status.online);
        assert!(status.chain_id.is_none());
        assert!(status.block_number.is_none());
        assert_eq!(status.id, "dead");
    }

    #[test]
    fn test_status_serialization_omits_absent_fields() {
        let status = EndpointStatus {
            id: "mainnet".to_string(),
            name: "Mainnet".to_string(),
            url: "https://eth.example.com".to_string(),
            symbol: "ETH".to_string(),
            online: false,
            chain_id: None,
            block_number: None,
            latency_ms: 42,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("chain_id"));
        assert!(!json.contains("block_number"));
        assert!(json.contains("\"latency_ms\":42"));
    }

    #[test]
    fn test_status_serialization_includes_present_fields() {
        let status = EndpointStatus {
            id: "mainnet".to_string(),
            name: "Mainnet".to_string(),
            url: "https://eth.example.com".to_string(),
            symbol: "ETH".to_string(),
            online: true,
            chain_id: Some("0x1".to_string()),
            block_number: Some("0x10d4f".to_string()),
            latency_ms: 17,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"chain_id\":\"0x1\""));
        assert!(json.contains("\"block_number\":\"0x10d4f\""));
    }
}
