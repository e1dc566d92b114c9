use alloy::primitives::{Address, Bytes, B256, U64};
use serde::{Deserialize, Serialize};

/// A log entry matched by one of the monitor's filter queries.
///
/// `topics[0]` is always the event signature hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLogEvent {
	pub block_number: u64,
	pub data: Bytes,
	pub topics: Vec<B256>,
	/// 0x-prefixed lowercase transaction hash
	pub tx_hash: String,
}

impl ChainLogEvent {
	/// Event signature hash (topic 0)
	pub fn signature(&self) -> Option<&B256> {
		self.topics.first()
	}

	/// Interprets an indexed topic as a left-padded address.
	pub fn topic_address(&self, index: usize) -> Option<Address> {
		self.topics
			.get(index)
			.map(|topic| Address::from_word(*topic))
	}
}

/// Log object as returned by `eth_getLogs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcLog {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	#[serde(rename = "blockNumber")]
	pub block_number: Option<U64>,
	#[serde(rename = "transactionHash")]
	pub transaction_hash: Option<B256>,
	#[serde(default)]
	pub removed: Option<bool>,
}

impl TryFrom<RpcLog> for ChainLogEvent {
	type Error = anyhow::Error;

	fn try_from(log: RpcLog) -> Result<Self, Self::Error> {
		let block_number = log
			.block_number
			.ok_or_else(|| anyhow::anyhow!("log without block number (pending block?)"))?;
		let tx_hash = log
			.transaction_hash
			.ok_or_else(|| anyhow::anyhow!("log without transaction hash"))?;

		Ok(Self {
			block_number: block_number.to::<u64>(),
			data: log.data,
			topics: log.topics,
			tx_hash: format!("{:#x}", tx_hash),
		})
	}
}
