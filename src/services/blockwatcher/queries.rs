//! Log filters of a round and the checkpoint updates that go with them.

use alloy::primitives::{Address, B256};

use crate::{
	models::{Checkpoint, Contracts, FilterQuery, RoundCommit},
	services::{blockwatcher::range::BlockRange, jobsmaker::EventKind},
};

/// Filters a round sends to the chain, and what committing the round records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPlan {
	pub queries: Vec<FilterQuery>,
	pub commit: RoundCommit,
}

impl RoundPlan {
	pub fn nothing() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.queries.is_empty() && self.commit.is_empty()
	}
}

fn address_topics(addresses: &[Address]) -> Vec<B256> {
	addresses.iter().map(|address| address.into_word()).collect()
}

fn query(addresses: Vec<Address>, range: BlockRange, topics: Vec<Option<Vec<B256>>>) -> FilterQuery {
	FilterQuery {
		addresses,
		from_block: range.from,
		to_block: range.to,
		topics,
	}
}

/// Agent filters over `range` for logs involving `accounts`.
///
/// Token transfers are matched on both sides: as sender by the first filter and as
/// recipient by the second.
pub fn agent_queries(range: BlockRange, contracts: &Contracts, accounts: &[Address]) -> RoundPlan {
	if range.is_empty() || accounts.is_empty() {
		return RoundPlan::nothing();
	}
	let accounts = address_topics(accounts);

	RoundPlan {
		queries: vec![
			query(
				vec![contracts.marketplace, contracts.token],
				range,
				vec![Some(EventKind::hashes(&EventKind::ALL)), Some(accounts.clone())],
			),
			query(
				vec![contracts.token],
				range,
				vec![
					Some(EventKind::hashes(&[EventKind::TokenTransfer])),
					None,
					Some(accounts),
				],
			),
		],
		commit: RoundCommit::none().set(Checkpoint::LastProcessedBlock, range.to),
	}
}

/// Client filters over the forward `range` and the backward `offerings` window.
///
/// Channel and offering lifecycle events are scanned for every agent, so the client
/// learns about offerings it has not dealt with yet.
pub fn client_queries(
	range: BlockRange,
	offerings: BlockRange,
	contracts: &Contracts,
	accounts: &[Address],
) -> RoundPlan {
	if accounts.is_empty() {
		return RoundPlan::nothing();
	}
	let accounts = address_topics(accounts);
	let mut plan = RoundPlan::nothing();

	if !range.is_empty() {
		plan.queries.push(query(
			vec![contracts.marketplace, contracts.token],
			range,
			vec![
				Some(EventKind::hashes(&[
					EventKind::TokenTransfer,
					EventKind::ChannelToppedUp,
					EventKind::ChannelCloseRequested,
				])),
				None,
				Some(accounts.clone()),
			],
		));
		plan.queries.push(query(
			vec![contracts.token],
			range,
			vec![
				Some(EventKind::hashes(&[
					EventKind::TokenTransfer,
					EventKind::TokenApproval,
				])),
				Some(accounts),
			],
		));
		plan.queries.push(query(
			vec![contracts.marketplace],
			range,
			vec![Some(EventKind::hashes(&[
				EventKind::ChannelCreated,
				EventKind::OfferingCreated,
				EventKind::OfferingDeleted,
				EventKind::OfferingPopedUp,
				EventKind::CooperativeClose,
				EventKind::UncooperativeClose,
			]))],
		));
		plan.commit = plan.commit.set(Checkpoint::LastProcessedBlock, range.to);
	}

	if !offerings.is_empty() {
		plan.queries.push(query(
			vec![contracts.marketplace],
			offerings,
			vec![Some(EventKind::hashes(&[
				EventKind::OfferingCreated,
				EventKind::OfferingPopedUp,
			]))],
		));
		plan.commit = plan
			.commit
			.set(Checkpoint::LastBackSearchBlock, offerings.from);
	}

	plan
}
