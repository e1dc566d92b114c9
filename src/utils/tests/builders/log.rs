//! Builder for test `ChainLogEvent` instances.

use alloy::{
	primitives::{Bytes, B256},
	sol_types::SolEvent,
};

use crate::models::ChainLogEvent;

pub struct LogBuilder {
	block_number: u64,
	data: Bytes,
	topics: Vec<B256>,
	tx_hash: String,
}

impl Default for LogBuilder {
	fn default() -> Self {
		Self {
			block_number: 1_000,
			data: Bytes::new(),
			topics: vec![],
			tx_hash: format!("{:#x}", B256::repeat_byte(0xab)),
		}
	}
}

impl LogBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes topics and data from an ABI encoded event
	pub fn event<E: SolEvent>(mut self, event: &E) -> Self {
		let encoded = event.encode_log_data();
		self.topics = encoded.topics().to_vec();
		self.data = encoded.data;
		self
	}

	pub fn topics(mut self, topics: Vec<B256>) -> Self {
		self.topics = topics;
		self
	}

	pub fn data(mut self, data: impl Into<Bytes>) -> Self {
		self.data = data.into();
		self
	}

	pub fn block_number(mut self, block_number: u64) -> Self {
		self.block_number = block_number;
		self
	}

	pub fn tx_hash(mut self, tx_hash: B256) -> Self {
		self.tx_hash = format!("{:#x}", tx_hash);
		self
	}

	pub fn build(self) -> ChainLogEvent {
		ChainLogEvent {
			block_number: self.block_number,
			data: self.data,
			topics: self.topics,
			tx_hash: self.tx_hash,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::jobsmaker::Transfer;
	use alloy::primitives::{address, U256};

	#[test]
	fn test_event_sets_signature_and_indexed_topics() {
		let from = address!("0x1111111111111111111111111111111111111111");
		let to = address!("0x2222222222222222222222222222222222222222");
		let log = LogBuilder::new()
			.event(&Transfer {
				from,
				to,
				value: U256::from(5),
			})
			.block_number(7)
			.build();

		assert_eq!(log.signature(), Some(&Transfer::SIGNATURE_HASH));
		assert_eq!(log.topic_address(1), Some(from));
		assert_eq!(log.topic_address(2), Some(to));
		assert_eq!(log.data.len(), 32);
		assert_eq!(log.block_number, 7);
	}
}
