//! Property-based tests for the block windows scanned by monitoring rounds.
//!
//! The forward window must stay below the confirmation depth, respect the block limit
//! and continue exactly where the previous round stopped. The client's backward offering
//! search must walk down without gaps and terminate at the fresh horizon.

use channel_monitor::services::blockwatcher::{offerings_range_of_interest, range_of_interest};
use proptest::{prelude::*, test_runner::Config};

use crate::properties::strategies::{scan_params_strategy, MAX_HEIGHT};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	/// # Properties tested
	/// - A window never reaches past `latest - confirmations`
	/// - With a non-zero limit a scannable window spans at most `limit` blocks
	/// - After the first round the window starts right after the last processed block
	#[test]
	fn test_range_of_interest_bounds(
		latest in 0..MAX_HEIGHT,
		(confirmations, limit) in scan_params_strategy(),
		last_processed in 0..MAX_HEIGHT,
	) {
		let range = range_of_interest(latest, confirmations, limit, last_processed);

		if !range.is_empty() {
			prop_assert!(range.to <= latest.saturating_sub(confirmations));
			prop_assert!(range.from >= 1);
			if limit != 0 {
				prop_assert!(range.to - range.from <= limit);
			}
		}
		if last_processed != 0 {
			prop_assert_eq!(range.from, last_processed + 1);
		}
	}

	/// # Properties tested
	/// - A fresh node starts at most `limit` blocks below the confirmed head
	#[test]
	fn test_range_of_interest_fresh_node(
		latest in 0..MAX_HEIGHT,
		(confirmations, limit) in scan_params_strategy(),
	) {
		let range = range_of_interest(latest, confirmations, limit, 0);
		let head = latest.saturating_sub(confirmations);

		if !range.is_empty() {
			prop_assert_eq!(range.to, head);
			prop_assert!(head - range.from < limit);
		}
	}

	/// Simulates consecutive rounds that commit `to` as the last processed block.
	///
	/// # Properties tested
	/// - Consecutive scanned windows neither overlap nor leave gaps
	/// - The scan never goes backwards
	#[test]
	fn test_consecutive_rounds_are_contiguous(
		start in 1_000u64..MAX_HEIGHT,
		(confirmations, limit) in scan_params_strategy(),
		steps in prop::collection::vec(0u64..50, 1..50),
	) {
		let mut latest = start;
		let mut last_processed = 0;

		for step in steps {
			latest += step;
			let range = range_of_interest(latest, confirmations, limit, last_processed);
			if range.is_empty() {
				continue;
			}
			if last_processed != 0 {
				prop_assert_eq!(range.from, last_processed + 1);
			}
			prop_assert!(range.to > last_processed);
			last_processed = range.to;
		}
	}

	/// # Properties tested
	/// - A backward window lies strictly below the previous one and above the genesis block
	/// - It never starts more than `confirmations` blocks below the fresh horizon
	#[test]
	fn test_offerings_range_bounds(
		up in 0..MAX_HEIGHT,
		(confirmations, limit) in scan_params_strategy(),
		fresh in 0u64..20_000,
		last_back_search in 0..MAX_HEIGHT,
	) {
		let range = offerings_range_of_interest(up, confirmations, limit, fresh, last_back_search);

		if !range.is_empty() {
			let last = if last_back_search == 0 {
				up.saturating_sub(confirmations) + 1
			} else {
				last_back_search
			};
			let horizon = up.saturating_sub(fresh);

			prop_assert!(range.from >= 1);
			prop_assert!(range.to < last);
			prop_assert!(range.to > horizon);
			prop_assert!(range.from >= horizon.saturating_sub(confirmations));
		}
	}

	/// Simulates the client's search committing `from` as the last back-search block.
	///
	/// # Properties tested
	/// - Consecutive backward windows are adjacent
	/// - The search ends after a bounded number of rounds
	#[test]
	fn test_offerings_search_terminates_without_gaps(
		up in 0u64..1_000_000,
		confirmations in 0u64..100,
		limit in 10u64..1_000,
		fresh in 0u64..20_000,
	) {
		let max_rounds = fresh / limit + 3;
		let mut last_back_search = 0;
		let mut previous: Option<u64> = None;
		let mut rounds = 0;

		loop {
			let range = offerings_range_of_interest(up, confirmations, limit, fresh, last_back_search);
			if range.is_empty() {
				break;
			}
			if let Some(previous_from) = previous {
				prop_assert_eq!(range.to + 1, previous_from);
			}
			previous = Some(range.from);
			last_back_search = range.from;

			rounds += 1;
			prop_assert!(rounds <= max_rounds);
		}
	}
}
