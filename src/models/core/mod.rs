//! Core domain models.
//!
//! - Networks: chain connection details
//! - Monitor configuration: role and contract addresses of the running node
//! - Jobs: work items derived from chain logs
//! - Checkpoints: persisted scan progress and the writes a round commits

mod checkpoint;
mod job;
mod monitor;
mod network;

pub use checkpoint::{Checkpoint, RoundCommit};
pub use job::{
	Closing, ClosingType, Job, JobCreator, JobData, JobEthLog, JobRecordClosingData, JobType,
	RelatedType,
};
pub use monitor::{Contracts, MonitorConfig, Role};
pub use network::{Network, RpcUrl};
