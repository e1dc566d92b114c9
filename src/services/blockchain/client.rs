//! Chain access used by the monitor.

use async_trait::async_trait;

use crate::models::{ChainLogEvent, FilterQuery};

/// The two chain reads a monitoring round needs
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Height of the chain head
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error>;

	/// Logs matching `query`, in the order the node returns them
	async fn filter_logs(&self, query: &FilterQuery) -> Result<Vec<ChainLogEvent>, anyhow::Error>;
}
