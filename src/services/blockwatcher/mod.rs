//! Block watcher service implementation.
//!
//! Scans confirmed block windows for marketplace and token logs and queues the jobs
//! they call for. It includes:
//! - Block window calculation for the forward scan and the client's offering search
//! - Filter construction per role
//! - The monitoring round and its cron-driven lifecycle

mod error;
mod queries;
mod range;
mod service;

pub use error::BlockWatcherError;
pub use queries::{agent_queries, client_queries, RoundPlan};
pub use range::{
	offerings_range_of_interest, range_of_interest, read_offerings_range_of_interest,
	read_range_of_interest, BlockRange,
};
pub use service::{BlockWatcherService, JobSchedulerTrait, MonitoringRound, RoundSummary};
