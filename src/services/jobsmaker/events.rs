//! Marketplace and token events the monitor reacts to.

use alloy::{
	primitives::{Address, B256, U256},
	sol,
	sol_types::SolEvent,
};
use std::{collections::HashMap, fmt};

use crate::{
	models::{ChainLogEvent, ClosingType},
	repositories::ChannelKey,
	services::jobsmaker::JobsMakerError,
};

sol! {
	event LogChannelCreated(address indexed _agent, address indexed _client, bytes32 indexed _offering_hash, uint192 _deposit);
	event LogChannelToppedUp(address indexed _agent, address indexed _client, bytes32 indexed _offering_hash, uint32 _open_block_number, uint192 _added_deposit);
	event LogChannelCloseRequested(address indexed _agent, address indexed _client, bytes32 indexed _offering_hash, uint32 _open_block_number, uint192 _balance);
	event LogOfferingCreated(address indexed _agent, bytes32 indexed _offering_hash, uint256 indexed _min_deposit, uint16 _current_supply);
	event LogOfferingDeleted(address indexed _agent, bytes32 indexed _offering_hash);
	event LogOfferingPopedUp(address indexed _agent, bytes32 indexed _offering_hash, uint256 indexed _min_deposit, uint16 _current_supply);
	event LogCooperativeChannelClose(address indexed _agent, address indexed _client, bytes32 indexed _offering_hash, uint32 _open_block_number, uint192 _balance);
	event LogUnCooperativeChannelClose(address indexed _agent, address indexed _client, bytes32 indexed _offering_hash, uint32 _open_block_number, uint192 _balance);

	event Transfer(address indexed from, address indexed to, uint256 value);
	event Approval(address indexed owner, address indexed spender, uint256 value);
}

/// Event identified by a log's topic0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	ChannelCreated,
	ChannelToppedUp,
	ChannelCloseRequested,
	OfferingCreated,
	OfferingDeleted,
	OfferingPopedUp,
	CooperativeClose,
	UncooperativeClose,
	TokenApproval,
	TokenTransfer,
}

impl EventKind {
	pub const ALL: [EventKind; 10] = [
		EventKind::ChannelCreated,
		EventKind::ChannelToppedUp,
		EventKind::ChannelCloseRequested,
		EventKind::OfferingCreated,
		EventKind::OfferingDeleted,
		EventKind::OfferingPopedUp,
		EventKind::CooperativeClose,
		EventKind::UncooperativeClose,
		EventKind::TokenApproval,
		EventKind::TokenTransfer,
	];

	pub fn signature_hash(&self) -> B256 {
		match self {
			EventKind::ChannelCreated => LogChannelCreated::SIGNATURE_HASH,
			EventKind::ChannelToppedUp => LogChannelToppedUp::SIGNATURE_HASH,
			EventKind::ChannelCloseRequested => LogChannelCloseRequested::SIGNATURE_HASH,
			EventKind::OfferingCreated => LogOfferingCreated::SIGNATURE_HASH,
			EventKind::OfferingDeleted => LogOfferingDeleted::SIGNATURE_HASH,
			EventKind::OfferingPopedUp => LogOfferingPopedUp::SIGNATURE_HASH,
			EventKind::CooperativeClose => LogCooperativeChannelClose::SIGNATURE_HASH,
			EventKind::UncooperativeClose => LogUnCooperativeChannelClose::SIGNATURE_HASH,
			EventKind::TokenApproval => Approval::SIGNATURE_HASH,
			EventKind::TokenTransfer => Transfer::SIGNATURE_HASH,
		}
	}

	/// Solidity signature, e.g. `Transfer(address,address,uint256)`
	pub fn signature(&self) -> &'static str {
		match self {
			EventKind::ChannelCreated => LogChannelCreated::SIGNATURE,
			EventKind::ChannelToppedUp => LogChannelToppedUp::SIGNATURE,
			EventKind::ChannelCloseRequested => LogChannelCloseRequested::SIGNATURE,
			EventKind::OfferingCreated => LogOfferingCreated::SIGNATURE,
			EventKind::OfferingDeleted => LogOfferingDeleted::SIGNATURE,
			EventKind::OfferingPopedUp => LogOfferingPopedUp::SIGNATURE,
			EventKind::CooperativeClose => LogCooperativeChannelClose::SIGNATURE,
			EventKind::UncooperativeClose => LogUnCooperativeChannelClose::SIGNATURE,
			EventKind::TokenApproval => Approval::SIGNATURE,
			EventKind::TokenTransfer => Transfer::SIGNATURE,
		}
	}

	/// topic0 → kind lookup table
	pub fn dispatch_table() -> HashMap<B256, EventKind> {
		EventKind::ALL
			.into_iter()
			.map(|kind| (kind.signature_hash(), kind))
			.collect()
	}

	/// Topic hashes of `kinds`, for a filter's topic0 position
	pub fn hashes(kinds: &[EventKind]) -> Vec<B256> {
		kinds.iter().map(EventKind::signature_hash).collect()
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.signature())
	}
}

/// Decodes `log` as event `E`, checking topic count and data layout.
pub fn decode<E: SolEvent>(log: &ChainLogEvent) -> Result<E, JobsMakerError> {
	E::decode_raw_log(log.topics.iter().copied(), &log.data).map_err(|e| {
		JobsMakerError::decode_error(
			format!("failed to decode {}", E::SIGNATURE),
			Some(Box::new(e)),
			Some(HashMap::from([
				("tx_hash".to_string(), log.tx_hash.clone()),
				("block".to_string(), log.block_number.to_string()),
			])),
		)
	})
}

/// A decoded channel event that names an existing channel by its open block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEvent {
	pub key: ChannelKey,
	/// Channel balance, present for close requests and closings
	pub balance: Option<U256>,
}

impl ChannelEvent {
	fn new(
		agent: Address,
		client: Address,
		offering_hash: B256,
		open_block: u32,
		balance: Option<U256>,
	) -> Self {
		Self {
			key: ChannelKey {
				offering_hash,
				agent,
				client,
				open_block,
			},
			balance,
		}
	}
}

/// Decodes the channel identity of a top-up, close request or closing log.
///
/// Returns `Ok(None)` for kinds whose payload has no open block number.
pub fn decode_channel_event(
	kind: EventKind,
	log: &ChainLogEvent,
) -> Result<Option<ChannelEvent>, JobsMakerError> {
	let event = match kind {
		EventKind::ChannelToppedUp => {
			let e: LogChannelToppedUp = decode(log)?;
			ChannelEvent::new(e._agent, e._client, e._offering_hash, e._open_block_number, None)
		}
		EventKind::ChannelCloseRequested => {
			let e: LogChannelCloseRequested = decode(log)?;
			ChannelEvent::new(
				e._agent,
				e._client,
				e._offering_hash,
				e._open_block_number,
				Some(U256::from(e._balance)),
			)
		}
		EventKind::CooperativeClose => {
			let e: LogCooperativeChannelClose = decode(log)?;
			ChannelEvent::new(
				e._agent,
				e._client,
				e._offering_hash,
				e._open_block_number,
				Some(U256::from(e._balance)),
			)
		}
		EventKind::UncooperativeClose => {
			let e: LogUnCooperativeChannelClose = decode(log)?;
			ChannelEvent::new(
				e._agent,
				e._client,
				e._offering_hash,
				e._open_block_number,
				Some(U256::from(e._balance)),
			)
		}
		_ => return Ok(None),
	};
	Ok(Some(event))
}

/// Closing flavour of a close event
pub fn closing_type(kind: EventKind) -> Option<ClosingType> {
	match kind {
		EventKind::CooperativeClose => Some(ClosingType::Coop),
		EventKind::UncooperativeClose => Some(ClosingType::Uncoop),
		_ => None,
	}
}
