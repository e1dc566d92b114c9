use alloy::primitives::Address;
use channel_monitor::{models::Contracts, services::blockwatcher::BlockRange};
use proptest::prelude::*;

/// Heights stay far below `u64::MAX` so window arithmetic never wraps.
pub const MAX_HEIGHT: u64 = 1_000_000_000;
const MAX_ACCOUNTS: usize = 10;

/// Scan parameters as stored in settings: (confirmations, block limit)
pub fn scan_params_strategy() -> impl Strategy<Value = (u64, u64)> {
	(0u64..100, 0u64..5_000)
}

pub fn address_strategy() -> impl Strategy<Value = Address> {
	any::<[u8; 20]>().prop_map(Address::from)
}

pub fn accounts_strategy() -> impl Strategy<Value = Vec<Address>> {
	prop::collection::vec(address_strategy(), 1..MAX_ACCOUNTS)
}

pub fn contracts_strategy() -> impl Strategy<Value = Contracts> {
	(address_strategy(), address_strategy())
		.prop_filter("contracts must differ", |(marketplace, token)| marketplace != token)
		.prop_map(|(marketplace, token)| Contracts { marketplace, token })
}

/// Any window, scannable or not
pub fn block_range_strategy() -> impl Strategy<Value = BlockRange> {
	(0..MAX_HEIGHT, 0..MAX_HEIGHT).prop_map(|(from, to)| BlockRange::new(from, to))
}

/// A window with `from < to`
pub fn scannable_range_strategy() -> impl Strategy<Value = BlockRange> {
	(1..MAX_HEIGHT, 1u64..10_000).prop_map(|(from, width)| BlockRange::new(from, from + width))
}
