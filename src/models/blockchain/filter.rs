use alloy::primitives::{Address, B256};
use serde_json::{json, Value};

/// Chain log filter: addresses plus positional topic sets.
///
/// Hashes inside one topic position are OR-ed, positions are AND-ed. `None` matches any
/// topic at that position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
	pub addresses: Vec<Address>,
	pub from_block: u64,
	pub to_block: u64,
	pub topics: Vec<Option<Vec<B256>>>,
}

impl FilterQuery {
	/// Builds the filter object expected by `eth_getLogs`
	pub fn to_rpc_params(&self) -> Value {
		let topics: Vec<Value> = self
			.topics
			.iter()
			.map(|position| match position {
				Some(hashes) => json!(hashes),
				None => Value::Null,
			})
			.collect();

		json!({
			"fromBlock": format!("0x{:x}", self.from_block),
			"toBlock": format!("0x{:x}", self.to_block),
			"address": self.addresses,
			"topics": topics,
		})
	}
}
