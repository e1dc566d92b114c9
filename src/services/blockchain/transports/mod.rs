//! JSON-RPC transport over HTTP with endpoint failover.

mod endpoint_manager;
mod error;
mod http;

pub use endpoint_manager::EndpointManager;
pub use error::TransportError;
pub use http::HttpTransportClient;

use reqwest_retry::{
	default_on_request_failure, default_on_request_success, Retryable, RetryableStrategy,
};
use serde_json::{json, Value};

/// HTTP status codes that make the transport move to the next endpoint
/// - 429: Too Many Requests
pub const ROTATE_ON_ERROR_CODES: [u16; 1] = [429];

/// Sends JSON-RPC requests to a chain node
#[async_trait::async_trait]
pub trait BlockchainTransport: Send + Sync {
	/// URL requests are currently sent to
	async fn get_current_url(&self) -> String;

	/// Sends `method` with `params` and returns the whole JSON-RPC response object
	async fn send_raw_request(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

/// A transport that can switch between several endpoints
#[async_trait::async_trait]
pub trait RotatingTransport: BlockchainTransport {
	/// Probes `url` without switching to it
	async fn try_connect(&self, url: &str) -> Result<(), anyhow::Error>;

	/// Makes `url` the active endpoint
	async fn update_client(&self, url: &str) -> Result<(), anyhow::Error>;
}

/// JSON-RPC 2.0 request envelope
pub fn rpc_request(method: &str, params: Value) -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"method": method,
		"params": params,
	})
}

/// Retries transient failures in place, except statuses that trigger endpoint rotation.
pub struct TransientErrorRetryStrategy;

impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(response) if ROTATE_ON_ERROR_CODES.contains(&response.status().as_u16()) => {
				Some(Retryable::Fatal)
			}
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}
