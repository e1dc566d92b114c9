//! SQLite connection pool shared by all repositories.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{path::Path, str::FromStr};
use tracing::info;

use crate::repositories::RepositoryError;

/// Handle to the controller database.
#[derive(Debug, Clone)]
pub struct Database {
	pool: SqlitePool,
}

impl Database {
	/// Connects to `database_url` (e.g. `sqlite://data/controller.db`), creating the file
	/// if it does not exist.
	pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
		info!(url = %database_url, "Connecting to database");

		let options = SqliteConnectOptions::from_str(database_url)
			.map_err(|e| RepositoryError::from_sqlx("parse database url", e))?
			.create_if_missing(true)
			.foreign_keys(true);

		let pool = SqlitePoolOptions::new()
			.max_connections(5)
			.min_connections(1)
			.connect_with(options)
			.await
			.map_err(|e| RepositoryError::from_sqlx("connect", e))?;

		Ok(Self { pool })
	}

	pub async fn new_with_path<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
		Self::new(&format!("sqlite://{}", path.as_ref().display())).await
	}

	/// Applies the embedded schema migrations.
	pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
		sqlx::migrate!("./migrations")
			.run(&self.pool)
			.await
			.map_err(|e| {
				RepositoryError::internal_error(
					format!("failed to run migrations: {}", e),
					Some(Box::new(e)),
					None,
				)
			})?;

		info!("Database migrations applied");
		Ok(())
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}
