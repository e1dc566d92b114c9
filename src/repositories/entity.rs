//! Lookups of accounts, offerings, channels and previously queued jobs.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::{
	models::{JobData, JobEthLog, JobType},
	repositories::RepositoryError,
};

/// Identity of a channel as emitted by the marketplace contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelKey {
	pub offering_hash: B256,
	pub agent: Address,
	pub client: Address,
	pub open_block: u32,
}

/// Read-only queries the job derivation needs. Misses are `Ok(None)` (or empty).
#[async_trait]
pub trait EntityRepositoryTrait: Send + Sync {
	/// Addresses of all accounts marked in use
	async fn in_use_addresses(&self) -> Result<Vec<Address>, RepositoryError>;

	/// Id of the first account owning any of `addresses`
	async fn find_account_id(&self, addresses: &[Address]) -> Result<Option<String>, RepositoryError>;

	async fn find_offering_id(&self, hash: &B256) -> Result<Option<String>, RepositoryError>;

	async fn find_channel_id(&self, key: &ChannelKey) -> Result<Option<String>, RepositoryError>;

	/// Channel whose creating transaction has `tx_hash`
	async fn find_channel_id_by_tx_hash(&self, tx_hash: &str) -> Result<Option<String>, RepositoryError>;

	/// Related id of a queued offering publish or pop-up job for offering `hash`
	async fn find_offering_create_job_related_id(
		&self,
		hash: &B256,
	) -> Result<Option<String>, RepositoryError>;

	/// Logs embedded in queued `incrementCurrentSupply` jobs whose topics start with `topics`
	async fn find_increment_supply_logs(
		&self,
		topics: &[B256],
	) -> Result<Vec<JobEthLog>, RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct EntityRepository {
	pool: SqlitePool,
}

impl EntityRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

fn hex<T: std::fmt::LowerHex>(value: &T) -> String {
	format!("{:#x}", value)
}

#[async_trait]
impl EntityRepositoryTrait for EntityRepository {
	async fn in_use_addresses(&self) -> Result<Vec<Address>, RepositoryError> {
		let rows: Vec<String> =
			sqlx::query_scalar("SELECT eth_addr FROM accounts WHERE in_use ORDER BY eth_addr")
				.fetch_all(&self.pool)
				.await
				.map_err(|e| RepositoryError::from_sqlx("select in-use accounts", e))?;

		rows.iter()
			.map(|raw| {
				raw.parse::<Address>().map_err(|e| {
					RepositoryError::parse_error(
						format!("invalid account address '{}'", raw),
						Some(Box::new(e)),
						None,
					)
				})
			})
			.collect()
	}

	async fn find_account_id(&self, addresses: &[Address]) -> Result<Option<String>, RepositoryError> {
		for address in addresses {
			let id: Option<String> =
				sqlx::query_scalar("SELECT id FROM accounts WHERE lower(eth_addr) = ?")
					.bind(hex(address))
					.fetch_optional(&self.pool)
					.await
					.map_err(|e| RepositoryError::from_sqlx("find account", e))?;
			if id.is_some() {
				return Ok(id);
			}
		}
		Ok(None)
	}

	async fn find_offering_id(&self, hash: &B256) -> Result<Option<String>, RepositoryError> {
		sqlx::query_scalar("SELECT id FROM offerings WHERE hash = ?")
			.bind(hex(hash))
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| RepositoryError::from_sqlx("find offering", e))
	}

	async fn find_channel_id(&self, key: &ChannelKey) -> Result<Option<String>, RepositoryError> {
		sqlx::query_scalar(
			"SELECT c.id FROM channels AS c JOIN offerings AS o ON c.offering = o.id \
			 WHERE o.hash = ? AND lower(c.agent) = ? AND lower(c.client) = ? AND c.block = ?",
		)
		.bind(hex(&key.offering_hash))
		.bind(hex(&key.agent))
		.bind(hex(&key.client))
		.bind(i64::from(key.open_block))
		.fetch_optional(&self.pool)
		.await
		.map_err(|e| RepositoryError::from_sqlx("find channel", e))
	}

	async fn find_channel_id_by_tx_hash(&self, tx_hash: &str) -> Result<Option<String>, RepositoryError> {
		sqlx::query_scalar(
			"SELECT c.id FROM channels AS c JOIN eth_txs AS t ON c.id = t.related_id \
			 WHERE t.hash = ?",
		)
		.bind(tx_hash.to_lowercase())
		.fetch_optional(&self.pool)
		.await
		.map_err(|e| RepositoryError::from_sqlx("find channel by tx", e))
	}

	async fn find_offering_create_job_related_id(
		&self,
		hash: &B256,
	) -> Result<Option<String>, RepositoryError> {
		sqlx::query_scalar(
			"SELECT related_id FROM jobs \
			 WHERE type IN (?, ?) AND json_extract(data, '$.ethereumLog.topics[2]') = ? \
			 LIMIT 1",
		)
		.bind(JobType::ClientAfterOfferingMsgBCPublish.as_str())
		.bind(JobType::ClientAfterOfferingPopUp.as_str())
		.bind(hex(hash))
		.fetch_optional(&self.pool)
		.await
		.map_err(|e| RepositoryError::from_sqlx("find offering create job", e))
	}

	async fn find_increment_supply_logs(
		&self,
		topics: &[B256],
	) -> Result<Vec<JobEthLog>, RepositoryError> {
		let mut sql =
			String::from("SELECT data FROM jobs WHERE type = ?");
		for position in 0..topics.len() {
			sql.push_str(&format!(
				" AND json_extract(data, '$.ethereumLog.topics[{}]') = ?",
				position
			));
		}

		let mut query = sqlx::query_scalar::<_, String>(&sql)
			.bind(JobType::IncrementCurrentSupply.as_str());
		for topic in topics {
			query = query.bind(hex(topic));
		}

		let rows = query
			.fetch_all(&self.pool)
			.await
			.map_err(|e| RepositoryError::from_sqlx("find increment supply jobs", e))?;

		rows.iter()
			.map(|raw| {
				serde_json::from_str::<JobData>(raw)
					.map(|data| data.eth_log)
					.map_err(|e| {
						RepositoryError::parse_error(
							"job data without an ethereum log",
							Some(Box::new(e)),
							Some(HashMap::from([(
								"job_type".to_string(),
								JobType::IncrementCurrentSupply.to_string(),
							)])),
						)
					})
			})
			.collect()
	}
}
