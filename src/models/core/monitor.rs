use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the marketplace this node plays. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Agent,
	Client,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Agent => f.write_str("agent"),
			Role::Client => f.write_str("client"),
		}
	}
}

/// Addresses of the marketplace (payment channel) contract and its token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Contracts {
	pub marketplace: Address,
	pub token: Address,
}

fn default_rate_after() -> u32 {
	10
}

fn default_request_timeout_ms() -> u64 {
	60_000
}

/// Monitor configuration, loaded from `config/monitor.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
	/// Slug of the network (from `config/networks`) to watch
	pub network: String,

	pub role: Role,

	pub contracts: Contracts,

	/// SQLite connection string, e.g. `sqlite://data/controller.db`
	pub database_url: String,

	/// Number of channel closings after which a rating job requests re-aggregation
	#[serde(default = "default_rate_after")]
	pub rate_after: u32,

	/// Timeout applied to every chain client call
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}
