//! Ethereum JSON-RPC client.

use std::{collections::HashMap, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
	models::{ChainLogEvent, FilterQuery, Network, RpcLog},
	services::blockchain::{
		client::ChainClient,
		transports::{BlockchainTransport, HttpTransportClient},
		BlockChainError,
	},
	utils::{parse_hex_quantity, RetryConfig},
};

/// Reads block height and logs from an Ethereum node.
#[derive(Clone)]
pub struct EthClient<T: BlockchainTransport> {
	transport: T,
}

impl<T: BlockchainTransport> EthClient<T> {
	pub fn new_with_transport(transport: T) -> Self {
		Self { transport }
	}

	/// Sends `method` and returns its `result`, turning JSON-RPC errors into
	/// [`BlockChainError::RequestError`].
	async fn call(&self, method: &str, params: Value) -> Result<Value, anyhow::Error> {
		let mut response = self
			.transport
			.send_raw_request(method, params)
			.await
			.map_err(|e| {
				BlockChainError::connection_error(
					format!("{} failed", method),
					Some(Box::new(e)),
					None,
				)
			})?;

		if let Some(error) = response.get("error") {
			let code = error.get("code").map(Value::to_string).unwrap_or_default();
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("unknown error");
			return Err(BlockChainError::request_error(
				format!("{} rejected: {}", method, message),
				None,
				Some(HashMap::from([
					("code".to_string(), code),
					("url".to_string(), self.transport.get_current_url().await),
				])),
			)
			.into());
		}

		match response.get_mut("result").map(Value::take) {
			Some(result) => Ok(result),
			None => Err(BlockChainError::response_error(
				format!("{} response has no 'result' field", method),
				None,
				None,
			)
			.into()),
		}
	}
}

impl EthClient<HttpTransportClient> {
	/// Connects to `network` over HTTP.
	pub async fn new(network: &Network, request_timeout: Duration) -> Result<Self, anyhow::Error> {
		let transport =
			HttpTransportClient::new(network, &RetryConfig::default(), request_timeout).await?;
		Ok(Self::new_with_transport(transport))
	}
}

#[async_trait]
impl<T: BlockchainTransport> ChainClient for EthClient<T> {
	#[instrument(skip(self))]
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error> {
		let result = self.call("eth_blockNumber", json!([])).await?;
		let quantity = result
			.as_str()
			.ok_or_else(|| anyhow::anyhow!("eth_blockNumber result is not a string: {}", result))?;
		parse_hex_quantity(quantity)
	}

	#[instrument(skip_all, fields(from_block = query.from_block, to_block = query.to_block))]
	async fn filter_logs(&self, query: &FilterQuery) -> Result<Vec<ChainLogEvent>, anyhow::Error> {
		let result = self
			.call("eth_getLogs", json!([query.to_rpc_params()]))
			.await?;

		let logs: Vec<RpcLog> =
			serde_json::from_value(result).context("Failed to parse eth_getLogs result")?;

		logs.into_iter()
			.filter(|log| log.removed != Some(true))
			.map(ChainLogEvent::try_from)
			.collect()
	}
}
