use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::models::ChainLogEvent;

/// Kind of work a job asks the job queue to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobType {
	AgentAfterChannelCreate,
	AgentAfterChannelTopUp,
	AgentAfterUncooperativeCloseRequest,
	AgentAfterUncooperativeClose,
	AgentAfterCooperativeClose,
	AgentAfterOfferingMsgBCPublish,
	AgentAfterOfferingPopUp,
	AgentAfterOfferingDelete,
	ClientAfterChannelCreate,
	ClientAfterChannelTopUp,
	ClientAfterUncooperativeCloseRequest,
	ClientAfterUncooperativeClose,
	ClientAfterCooperativeClose,
	ClientAfterOfferingMsgBCPublish,
	ClientAfterOfferingPopUp,
	ClientAfterOfferingDelete,
	ClientRecordClosing,
	AfterAccountAddBalanceApprove,
	AfterAccountAddBalance,
	AfterAccountReturnBalance,
	DecrementCurrentSupply,
	IncrementCurrentSupply,
}

impl JobType {
	pub const ALL: [JobType; 22] = [
		JobType::AgentAfterChannelCreate,
		JobType::AgentAfterChannelTopUp,
		JobType::AgentAfterUncooperativeCloseRequest,
		JobType::AgentAfterUncooperativeClose,
		JobType::AgentAfterCooperativeClose,
		JobType::AgentAfterOfferingMsgBCPublish,
		JobType::AgentAfterOfferingPopUp,
		JobType::AgentAfterOfferingDelete,
		JobType::ClientAfterChannelCreate,
		JobType::ClientAfterChannelTopUp,
		JobType::ClientAfterUncooperativeCloseRequest,
		JobType::ClientAfterUncooperativeClose,
		JobType::ClientAfterCooperativeClose,
		JobType::ClientAfterOfferingMsgBCPublish,
		JobType::ClientAfterOfferingPopUp,
		JobType::ClientAfterOfferingDelete,
		JobType::ClientRecordClosing,
		JobType::AfterAccountAddBalanceApprove,
		JobType::AfterAccountAddBalance,
		JobType::AfterAccountReturnBalance,
		JobType::DecrementCurrentSupply,
		JobType::IncrementCurrentSupply,
	];

	/// Name stored in the `jobs.type` column
	pub fn as_str(&self) -> &'static str {
		match self {
			JobType::AgentAfterChannelCreate => "agentAfterChannelCreate",
			JobType::AgentAfterChannelTopUp => "agentAfterChannelTopUp",
			JobType::AgentAfterUncooperativeCloseRequest => "agentAfterUncooperativeCloseRequest",
			JobType::AgentAfterUncooperativeClose => "agentAfterUncooperativeClose",
			JobType::AgentAfterCooperativeClose => "agentAfterCooperativeClose",
			JobType::AgentAfterOfferingMsgBCPublish => "agentAfterOfferingMsgBCPublish",
			JobType::AgentAfterOfferingPopUp => "agentAfterOfferingPopUp",
			JobType::AgentAfterOfferingDelete => "agentAfterOfferingDelete",
			JobType::ClientAfterChannelCreate => "clientAfterChannelCreate",
			JobType::ClientAfterChannelTopUp => "clientAfterChannelTopUp",
			JobType::ClientAfterUncooperativeCloseRequest => {
				"clientAfterUncooperativeCloseRequest"
			}
			JobType::ClientAfterUncooperativeClose => "clientAfterUncooperativeClose",
			JobType::ClientAfterCooperativeClose => "clientAfterCooperativeClose",
			JobType::ClientAfterOfferingMsgBCPublish => "clientAfterOfferingMsgBCPublish",
			JobType::ClientAfterOfferingPopUp => "clientAfterOfferingPopUp",
			JobType::ClientAfterOfferingDelete => "clientAfterOfferingDelete",
			JobType::ClientRecordClosing => "clientRecordClosing",
			JobType::AfterAccountAddBalanceApprove => "afterAccountAddBalanceApprove",
			JobType::AfterAccountAddBalance => "afterAccountAddBalance",
			JobType::AfterAccountReturnBalance => "afterAccountReturnBalance",
			JobType::DecrementCurrentSupply => "decrementCurrentSupply",
			JobType::IncrementCurrentSupply => "incrementCurrentSupply",
		}
	}
}

impl fmt::Display for JobType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for JobType {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		JobType::ALL
			.into_iter()
			.find(|job_type| job_type.as_str() == s)
			.ok_or_else(|| anyhow::anyhow!("unknown job type: {}", s))
	}
}

/// Database entity a job is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedType {
	Offering,
	Channel,
	Account,
}

impl RelatedType {
	pub fn as_str(&self) -> &'static str {
		match self {
			RelatedType::Offering => "offering",
			RelatedType::Channel => "channel",
			RelatedType::Account => "account",
		}
	}
}

impl fmt::Display for RelatedType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Origin tag stored with every job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCreator {
	#[serde(rename = "bc_monitor")]
	BcMonitor,
}

impl JobCreator {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobCreator::BcMonitor => "bc_monitor",
		}
	}
}

/// A unit of follow-up work handed to the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
	pub id: String,
	#[serde(rename = "type")]
	pub job_type: JobType,
	pub related_type: RelatedType,
	pub related_id: String,
	/// JSON payload, opaque to the queue
	pub data: serde_json::Value,
	pub created_by: JobCreator,
}

impl Job {
	pub fn new(
		job_type: JobType,
		related_type: RelatedType,
		related_id: impl Into<String>,
		data: serde_json::Value,
	) -> Self {
		Self {
			id: Uuid::new_v4().to_string(),
			job_type,
			related_type,
			related_id: related_id.into(),
			data,
			created_by: JobCreator::BcMonitor,
		}
	}

	/// The chain log this job was derived from, if its payload embeds one.
	pub fn eth_log(&self) -> Option<JobEthLog> {
		serde_json::from_value::<JobData>(self.data.clone())
			.ok()
			.map(|data| data.eth_log)
	}
}

/// Chain log as embedded in a job payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEthLog {
	pub block: u64,
	pub data: Bytes,
	pub topics: Vec<B256>,
	#[serde(rename = "transactionHash")]
	pub tx_hash: String,
}

impl From<&ChainLogEvent> for JobEthLog {
	fn from(log: &ChainLogEvent) -> Self {
		Self {
			block: log.block_number,
			data: log.data.clone(),
			topics: log.topics.clone(),
			tx_hash: log.tx_hash.clone(),
		}
	}
}

/// Payload of every log-derived job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
	#[serde(rename = "ethereumLog")]
	pub eth_log: JobEthLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingType {
	Coop,
	Uncoop,
}

/// A channel closing, recorded for rating computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closing {
	pub id: String,
	#[serde(rename = "type")]
	pub closing_type: ClosingType,
	pub agent: Address,
	pub client: Address,
	pub balance: U256,
	pub block: u32,
}

/// Payload of `clientRecordClosing` jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecordClosingData {
	pub rec: Closing,
	#[serde(rename = "updateRatings")]
	pub update_ratings: bool,
}
