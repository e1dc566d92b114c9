//! Job queue persistence and the atomic round commit.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::{
	models::{Job, JobType, RoundCommit},
	repositories::{RepositoryError, SettingsRepository},
};

/// Persists the outcome of a monitoring round.
#[async_trait]
pub trait RoundStore: Send + Sync {
	/// Inserts `jobs` and applies `commit` in one transaction.
	///
	/// On any failure nothing is persisted.
	async fn commit_round(&self, jobs: &[Job], commit: &RoundCommit) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct JobRepository {
	pool: SqlitePool,
}

impl JobRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Queues `job` on an open transaction.
	pub async fn add_job(conn: &mut SqliteConnection, job: &Job) -> Result<(), RepositoryError> {
		let data = serde_json::to_string(&job.data).map_err(|e| {
			RepositoryError::internal_error(
				"failed to serialize job data",
				Some(Box::new(e)),
				Some(HashMap::from([("job_id".to_string(), job.id.clone())])),
			)
		})?;

		sqlx::query(
			"INSERT INTO jobs (id, type, status, related_type, related_id, created_at, created_by, try_count, data) \
			 VALUES (?, ?, 'active', ?, ?, ?, ?, 0, ?)",
		)
		.bind(&job.id)
		.bind(job.job_type.as_str())
		.bind(job.related_type.as_str())
		.bind(&job.related_id)
		.bind(Utc::now().to_rfc3339())
		.bind(job.created_by.as_str())
		.bind(data)
		.execute(conn)
		.await
		.map_err(|e| RepositoryError::from_sqlx("add job", e))?;

		Ok(())
	}

	/// All queued jobs in insertion order
	pub async fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
		let rows = sqlx::query(
			"SELECT id, type, related_type, related_id, created_by, data FROM jobs ORDER BY rowid",
		)
		.fetch_all(&self.pool)
		.await
		.map_err(|e| RepositoryError::from_sqlx("list jobs", e))?;

		rows.iter()
			.map(|row| {
				let job_type: String = row.get("type");
				let data: String = row.get("data");
				let parse = |field: &str, e: String| {
					RepositoryError::parse_error(
						format!("invalid job {}: {}", field, e),
						None,
						Some(HashMap::from([("job_id".to_string(), row.get("id"))])),
					)
				};

				Ok(Job {
					id: row.get("id"),
					job_type: job_type
						.parse::<JobType>()
						.map_err(|e| parse("type", e.to_string()))?,
					related_type: serde_json::from_value(serde_json::Value::String(
						row.get("related_type"),
					))
					.map_err(|e| parse("related_type", e.to_string()))?,
					related_id: row.get("related_id"),
					data: serde_json::from_str(&data).map_err(|e| parse("data", e.to_string()))?,
					created_by: serde_json::from_value(serde_json::Value::String(
						row.get("created_by"),
					))
					.map_err(|e| parse("created_by", e.to_string()))?,
				})
			})
			.collect()
	}

	pub async fn count_jobs(&self) -> Result<u64, RepositoryError> {
		let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
			.fetch_one(&self.pool)
			.await
			.map_err(|e| RepositoryError::from_sqlx("count jobs", e))?;
		Ok(count as u64)
	}
}

#[async_trait]
impl RoundStore for JobRepository {
	async fn commit_round(&self, jobs: &[Job], commit: &RoundCommit) -> Result<(), RepositoryError> {
		let mut tx = self
			.pool
			.begin()
			.await
			.map_err(|e| RepositoryError::from_sqlx("begin round transaction", e))?;

		for job in jobs {
			Self::add_job(&mut tx, job).await?;
		}
		for (checkpoint, block) in &commit.updates {
			SettingsRepository::write_uint(&mut tx, checkpoint.key(), *block).await?;
		}

		// Dropping `tx` on an early return rolls it back.
		tx.commit()
			.await
			.map_err(|e| RepositoryError::from_sqlx("commit round transaction", e))
	}
}
