//! Domain models of the channel monitor.
//!
//! - `blockchain`: chain log events and log filter queries
//! - `config`: configuration loading and validation
//! - `core`: networks, monitor configuration, roles and jobs

mod blockchain;
mod config;
mod core;

pub use blockchain::{ChainLogEvent, FilterQuery, RpcLog};

pub use core::{
	Checkpoint, Closing, ClosingType, Contracts, Job, JobCreator, JobData, JobEthLog,
	JobRecordClosingData, JobType, MonitorConfig, Network, RelatedType, Role, RoundCommit, RpcUrl,
};

pub use config::{ConfigError, ConfigLoader};
