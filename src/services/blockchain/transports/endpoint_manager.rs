//! Active/fallback endpoint bookkeeping and failover for JSON-RPC requests.

use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};

use crate::services::blockchain::transports::{
	rpc_request, RotatingTransport, TransportError, ROTATE_ON_ERROR_CODES,
};

/// Tracks which RPC endpoint is active and rotates to a fallback when it fails.
#[derive(Clone, Debug)]
pub struct EndpointManager {
	pub active_url: Arc<RwLock<String>>,
	pub fallback_urls: Arc<RwLock<Vec<String>>>,
	client: ClientWithMiddleware,
	rotation_lock: Arc<Mutex<()>>,
}

/// Why a request on the active endpoint did not produce a JSON body
enum Failure {
	Status(reqwest::StatusCode, String),
	Network(reqwest_middleware::Error),
	Decode(reqwest::Error),
}

impl EndpointManager {
	pub fn new(client: ClientWithMiddleware, active_url: &str, fallback_urls: Vec<String>) -> Self {
		Self {
			active_url: Arc::new(RwLock::new(active_url.to_string())),
			fallback_urls: Arc::new(RwLock::new(fallback_urls)),
			client,
			rotation_lock: Arc::new(Mutex::new(())),
		}
	}

	/// Switches to the first fallback that accepts a connection.
	///
	/// The previously active URL is appended to the fallbacks.
	pub async fn try_rotate_url<T: RotatingTransport>(
		&self,
		transport: &T,
	) -> Result<String, TransportError> {
		let _guard = self.rotation_lock.lock().await;
		let current = self.active_url.read().await.clone();
		let candidates = self.fallback_urls.read().await.clone();

		let mut last_error = None;
		for candidate in candidates.iter().filter(|url| **url != current) {
			if let Err(e) = transport.try_connect(candidate).await {
				tracing::debug!(url = %candidate, error = %e, "Fallback endpoint unavailable");
				last_error = Some(e);
				continue;
			}
			transport.update_client(candidate).await.map_err(|e| {
				TransportError::url_rotation(
					format!("failed to switch transport to '{}'", candidate),
					Some(e.into()),
					None,
				)
			})?;

			let mut fallbacks = self.fallback_urls.write().await;
			fallbacks.retain(|url| url != candidate);
			fallbacks.push(current.clone());
			*self.active_url.write().await = candidate.clone();

			tracing::info!(from = %current, to = %candidate, "Rotated RPC endpoint");
			return Ok(candidate.clone());
		}

		Err(TransportError::url_rotation(
			"no fallback URL accepted a connection",
			last_error.map(|e| e.into()),
			Some(HashMap::from([("active_url".to_string(), current)])),
		))
	}

	async fn post(&self, url: &str, body: &Value) -> Result<Value, Failure> {
		let response = self
			.client
			.post(url)
			.json(body)
			.send()
			.await
			.map_err(Failure::Network)?;

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(Failure::Status(status, text));
		}

		response
			.json::<Value>()
			.await
			.map_err(Failure::Decode)
	}

	/// Sends a JSON-RPC request on the active endpoint.
	///
	/// Network failures and statuses in [`ROTATE_ON_ERROR_CODES`] rotate to the next endpoint
	/// and resend, at most once per known endpoint. Other HTTP errors fail immediately.
	pub async fn send_raw_request<T: RotatingTransport>(
		&self,
		transport: &T,
		method: &str,
		params: Value,
	) -> Result<Value, TransportError> {
		let body = rpc_request(method, params);
		let max_rotations = self.fallback_urls.read().await.len();
		let mut rotations = 0;

		loop {
			let url = self.active_url.read().await.clone();

			let failure = match self.post(&url, &body).await {
				Ok(value) => return Ok(value),
				Err(Failure::Status(status, text))
					if !ROTATE_ON_ERROR_CODES.contains(&status.as_u16()) =>
				{
					return Err(TransportError::http(status, url, text, None, None));
				}
				Err(Failure::Decode(e)) => {
					return Err(TransportError::response_parse(
						format!("invalid response to {}", method),
						Some(Box::new(e)),
						None,
					));
				}
				Err(failure) => failure,
			};
			tracing::warn!(url = %url, method = %method, "Request failed on active endpoint");

			let rotated = if rotations < max_rotations {
				rotations += 1;
				self.try_rotate_url(transport).await
			} else {
				Err(TransportError::url_rotation(
					"every endpoint has been tried",
					None,
					None,
				))
			};

			if let Err(rotation_error) = rotated {
				let source: Box<dyn std::error::Error + Send + Sync> = Box::new(rotation_error);
				return Err(match failure {
					Failure::Status(status, text) => {
						TransportError::http(status, url, text, Some(source), None)
					}
					Failure::Network(e) => TransportError::network(e.to_string(), Some(source), None),
					Failure::Decode(e) => {
						TransportError::response_parse(e.to_string(), Some(source), None)
					}
				});
			}
		}
	}
}
