//! Key/value settings: configured scan parameters and scan checkpoints.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::{models::Checkpoint, repositories::RepositoryError};

/// Confirmations a block needs before its logs are scanned
pub const MIN_CONFIRMATIONS_KEY: &str = "eth.min.confirmations";
/// Maximum length of one scan window
pub const BLOCK_LIMIT_KEY: &str = "eth.event.blocklimit";
/// How far back (in blocks) a client searches for offerings
pub const FRESH_OFFERINGS_KEY: &str = "eth.event.freshofferings";

/// Read access to the settings table.
///
/// Writes that must land together with a round's jobs go through
/// [`SettingsRepository::write_uint`] on the round transaction instead.
#[async_trait]
pub trait SettingsRepositoryTrait: Send + Sync {
	/// Reads an unsigned integer setting. A missing key is an error.
	async fn read_uint(&self, key: &str) -> Result<u64, RepositoryError>;

	/// Stores `value` unless `key` already exists, and returns the value in effect.
	async fn insert_if_absent(&self, key: &str, value: u64) -> Result<u64, RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
	pool: SqlitePool,
}

fn key_metadata(key: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([("key".to_string(), key.to_string())]))
}

fn parse_uint(key: &str, value: &str) -> Result<u64, RepositoryError> {
	value.trim().parse::<u64>().map_err(|e| {
		RepositoryError::parse_error(
			format!("setting is not an unsigned integer: '{}'", value),
			Some(Box::new(e)),
			key_metadata(key),
		)
	})
}

impl SettingsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Upserts `key = value` on an open transaction.
	pub async fn write_uint(
		conn: &mut SqliteConnection,
		key: &str,
		value: u64,
	) -> Result<(), RepositoryError> {
		sqlx::query(
			"INSERT INTO settings (key, value) VALUES (?, ?) \
			 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
		)
		.bind(key)
		.bind(value.to_string())
		.execute(conn)
		.await
		.map_err(|e| RepositoryError::from_sqlx("write setting", e))?;
		Ok(())
	}

	/// Creates the checkpoints a role needs with value 0 when they are absent.
	pub async fn init_checkpoints(&self, checkpoints: &[Checkpoint]) -> Result<(), RepositoryError> {
		for checkpoint in checkpoints {
			self.insert_if_absent(checkpoint.key(), 0).await?;
		}
		Ok(())
	}
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
	async fn read_uint(&self, key: &str) -> Result<u64, RepositoryError> {
		let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
			.bind(key)
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| RepositoryError::from_sqlx("read setting", e))?;

		match value {
			Some(value) => parse_uint(key, &value),
			None => Err(RepositoryError::not_found(
				"setting missing",
				None,
				key_metadata(key),
			)),
		}
	}

	async fn insert_if_absent(&self, key: &str, value: u64) -> Result<u64, RepositoryError> {
		sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
			.bind(key)
			.bind(value.to_string())
			.execute(&self.pool)
			.await
			.map_err(|e| RepositoryError::from_sqlx("insert setting", e))?;

		self.read_uint(key).await
	}
}
