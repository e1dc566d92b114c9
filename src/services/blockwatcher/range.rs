//! Block windows scanned by a round.
//!
//! All arithmetic saturates at 0, so fresh chains and small heights never underflow.

use std::fmt;

use crate::{
	models::Checkpoint,
	repositories::{
		RepositoryError, SettingsRepositoryTrait, BLOCK_LIMIT_KEY, FRESH_OFFERINGS_KEY,
		MIN_CONFIRMATIONS_KEY,
	},
};

/// Inclusive block window `[from, to]`. Windows with `from >= to` are not scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRange {
	pub from: u64,
	pub to: u64,
}

impl BlockRange {
	pub fn new(from: u64, to: u64) -> Self {
		Self { from, to }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.from >= self.to
	}
}

impl fmt::Display for BlockRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {}]", self.from, self.to)
	}
}

/// Forward window following the last processed block.
///
/// A fresh node (`last_processed == 0`) starts `limit` blocks below the confirmed head.
/// The window never reaches past `latest - confirmations` and spans at most `limit`
/// blocks when `limit` is non-zero.
pub fn range_of_interest(
	latest: u64,
	confirmations: u64,
	limit: u64,
	last_processed: u64,
) -> BlockRange {
	let first = if last_processed == 0 {
		latest.saturating_sub(confirmations).saturating_sub(limit)
	} else {
		last_processed
	};

	let from = first + 1;
	let mut to = latest.saturating_sub(confirmations);
	if limit != 0 && to > from && to - from > limit {
		to = from + limit;
	}
	BlockRange { from, to }
}

/// Backward window of the client's offering search.
///
/// Walks down from `last_back_search` (or from the monitoring start block `up` on the
/// first round) in steps of `limit`, and stops once the window drops below the
/// `fresh` horizon. The genesis block is never searched. Returns [`BlockRange::empty`]
/// when there is nothing left to search.
pub fn offerings_range_of_interest(
	up: u64,
	confirmations: u64,
	limit: u64,
	fresh: u64,
	last_back_search: u64,
) -> BlockRange {
	let last = if last_back_search == 0 {
		up.saturating_sub(confirmations) + 1
	} else {
		last_back_search
	};

	let mut from = last.saturating_sub(limit).saturating_sub(1);
	let to = last.saturating_sub(1);

	let horizon = up.saturating_sub(fresh);
	if to <= horizon {
		return BlockRange::empty();
	}
	if from < horizon {
		from = horizon.saturating_sub(confirmations);
	}
	// Block 0 would read back as "never searched" and restart the search.
	from = from.max(1);
	if to <= from {
		return BlockRange::empty();
	}
	BlockRange { from, to }
}

/// [`range_of_interest`] with parameters and checkpoint read from the settings table.
pub async fn read_range_of_interest<S: SettingsRepositoryTrait + ?Sized>(
	settings: &S,
	latest: u64,
) -> Result<BlockRange, RepositoryError> {
	let confirmations = settings.read_uint(MIN_CONFIRMATIONS_KEY).await?;
	let limit = settings.read_uint(BLOCK_LIMIT_KEY).await?;
	let last_processed = settings
		.read_uint(Checkpoint::LastProcessedBlock.key())
		.await?;

	Ok(range_of_interest(latest, confirmations, limit, last_processed))
}

/// [`offerings_range_of_interest`] with parameters and checkpoint read from the settings table.
pub async fn read_offerings_range_of_interest<S: SettingsRepositoryTrait + ?Sized>(
	settings: &S,
	up: u64,
) -> Result<BlockRange, RepositoryError> {
	let confirmations = settings.read_uint(MIN_CONFIRMATIONS_KEY).await?;
	let limit = settings.read_uint(BLOCK_LIMIT_KEY).await?;
	let fresh = settings.read_uint(FRESH_OFFERINGS_KEY).await?;
	let last_back_search = settings
		.read_uint(Checkpoint::LastBackSearchBlock.key())
		.await?;

	Ok(offerings_range_of_interest(
		up,
		confirmations,
		limit,
		fresh,
		last_back_search,
	))
}
