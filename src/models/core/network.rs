use serde::{Deserialize, Serialize};

/// Connection details of the EVM network the monitor reads logs from.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Network {
	/// Unique identifier for this network
	pub slug: String,

	/// Human-readable name of the network
	pub name: String,

	/// Chain ID of the network
	pub chain_id: u64,

	/// RPC endpoints with their weights for failover ordering
	pub rpc_urls: Vec<RpcUrl>,

	/// Average block time in milliseconds
	pub block_time_ms: u64,

	/// Cron expression driving monitoring rounds
	pub cron_schedule: String,
}

/// RPC endpoint with its failover weight
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RpcUrl {
	/// Type of RPC endpoint (only "rpc" is supported)
	pub type_: String,

	/// URL of the RPC endpoint
	pub url: String,

	/// Weight for ordering endpoints (0-100, 0 disables the endpoint)
	pub weight: u32,
}
