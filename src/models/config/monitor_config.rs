//! Monitor configuration loading and validation.

use async_trait::async_trait;
use std::path::Path;

use crate::models::{
	config::{path_metadata, read_json_file},
	ConfigError, ConfigLoader, MonitorConfig,
};

#[async_trait]
impl ConfigLoader for MonitorConfig {
	const DEFAULT_DIR: &'static str = "config";

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let config: MonitorConfig = read_json_file(path)?;
		config.validate().map_err(|e| match e {
			ConfigError::ValidationError(ctx) => ConfigError::ValidationError(
				ctx.with_metadata("path", path.display().to_string()),
			),
			other => other,
		})?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.is_empty() {
			return Err(ConfigError::validation_error(
				"Network slug is required",
				None,
				None,
			));
		}

		if self.contracts.marketplace.is_zero() || self.contracts.token.is_zero() {
			return Err(ConfigError::validation_error(
				"Marketplace and token contract addresses must be set",
				None,
				None,
			));
		}

		if self.contracts.marketplace == self.contracts.token {
			return Err(ConfigError::validation_error(
				"Marketplace and token contracts must differ",
				None,
				None,
			));
		}

		if !self.database_url.starts_with("sqlite:") {
			return Err(ConfigError::validation_error(
				"database_url must be a sqlite connection string",
				None,
				path_metadata(Path::new(&self.database_url)),
			));
		}

		if self.rate_after == 0 {
			return Err(ConfigError::validation_error(
				"rate_after must be greater than 0",
				None,
				None,
			));
		}

		if self.request_timeout_ms < 100 {
			return Err(ConfigError::validation_error(
				"request_timeout_ms must be at least 100ms",
				None,
				None,
			));
		}

		Ok(())
	}
}
