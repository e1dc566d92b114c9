//! HTTP JSON-RPC transport with weighted endpoints and failover.

use anyhow::Context;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::{
	models::Network,
	services::blockchain::transports::{
		rpc_request, BlockchainTransport, EndpointManager, RotatingTransport,
		TransientErrorRetryStrategy, TransportError,
	},
	utils::http::{create_retryable_http_client, RetryConfig},
};

/// JSON-RPC client for a chain node.
///
/// Endpoints with weight 0 are ignored; the rest are tried in descending weight order.
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	client: ClientWithMiddleware,
	endpoint_manager: EndpointManager,
}

impl HttpTransportClient {
	/// Connects to the highest-weight endpoint that answers a `net_version` probe.
	pub async fn new(
		network: &Network,
		retry_config: &RetryConfig,
		request_timeout: Duration,
	) -> Result<Self, anyhow::Error> {
		let mut rpc_urls: Vec<_> = network
			.rpc_urls
			.iter()
			.filter(|rpc_url| rpc_url.type_ == "rpc" && rpc_url.weight > 0)
			.collect();
		rpc_urls.sort_by(|a, b| b.weight.cmp(&a.weight));

		let base_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(request_timeout)
			.connect_timeout(Duration::from_secs(20))
			.build()
			.context("Failed to create base HTTP client")?;
		let client =
			create_retryable_http_client(retry_config, base_client, TransientErrorRetryStrategy);

		for rpc_url in &rpc_urls {
			if let Err(e) = probe(&client, &rpc_url.url).await {
				tracing::warn!(network = %network.slug, url = %rpc_url.url, error = %e, "RPC endpoint unavailable");
				continue;
			}

			let fallback_urls = rpc_urls
				.iter()
				.filter(|other| other.url != rpc_url.url)
				.map(|other| other.url.clone())
				.collect();

			tracing::info!(network = %network.slug, url = %rpc_url.url, "Connected to RPC endpoint");
			return Ok(Self {
				endpoint_manager: EndpointManager::new(client.clone(), &rpc_url.url, fallback_urls),
				client,
			});
		}

		Err(anyhow::anyhow!(
			"All RPC URLs of network '{}' failed to connect",
			network.slug
		))
	}
}

async fn probe(client: &ClientWithMiddleware, url: &str) -> Result<(), anyhow::Error> {
	let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
	let response = client
		.post(url.clone())
		.json(&rpc_request("net_version", json!([])))
		.send()
		.await
		.with_context(|| format!("Failed to connect to {}", url))?;

	if !response.status().is_success() {
		return Err(anyhow::anyhow!(
			"Failed to connect to {}: {}",
			url,
			response.status().as_u16()
		));
	}
	Ok(())
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.endpoint_manager.active_url.read().await.clone()
	}

	async fn send_raw_request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
		self.endpoint_manager
			.send_raw_request(self, method, params)
			.await
	}
}

#[async_trait]
impl RotatingTransport for HttpTransportClient {
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error> {
		probe(&self.client, url).await
	}

	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error> {
		let parsed = Url::parse(url).map_err(|_| anyhow::anyhow!("Invalid URL: {}", url))?;
		*self.endpoint_manager.active_url.write().await =
			parsed.as_str().trim_end_matches('/').to_string();
		Ok(())
	}
}
