//! Network configuration loading and validation.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path, str::FromStr};

use crate::{
	models::{
		config::{path_metadata, read_json_file},
		ConfigError, ConfigLoader, Network,
	},
	utils::{get_cron_interval_ms, normalize_string},
};

impl Network {
	/// Number of blocks produced between two monitoring rounds.
	///
	/// Returns 0 when the cron schedule cannot be evaluated.
	pub fn blocks_per_round(&self) -> u64 {
		let interval_ms = get_cron_interval_ms(&self.cron_schedule).unwrap_or(0) as u64;
		interval_ms / self.block_time_ms.max(1)
	}

	fn validate_uniqueness(
		instances: &[&Self],
		current: &Self,
		file_path: &str,
	) -> Result<(), ConfigError> {
		if instances
			.iter()
			.any(|existing| normalize_string(&existing.slug) == normalize_string(&current.slug))
		{
			return Err(ConfigError::validation_error(
				format!("Duplicate network slug found: '{}'", current.slug),
				None,
				Some(HashMap::from([
					("network_slug".to_string(), current.slug.clone()),
					("path".to_string(), file_path.to_string()),
				])),
			));
		}
		Ok(())
	}
}

#[async_trait]
impl ConfigLoader for Network {
	const DEFAULT_DIR: &'static str = "config/networks";

	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let network_dir = path.unwrap_or(Path::new(Self::DEFAULT_DIR));

		if !network_dir.exists() {
			return Err(ConfigError::file_error(
				"networks directory not found",
				None,
				path_metadata(network_dir),
			));
		}

		let mut pairs: Vec<(String, Network)> = Vec::new();
		for entry in std::fs::read_dir(network_dir)? {
			let path = entry?.path();
			if !Self::is_json_file(&path) {
				continue;
			}

			let network = Self::load_from_path(&path).await?;
			let existing: Vec<&Network> = pairs.iter().map(|(_, n)| n).collect();
			Self::validate_uniqueness(&existing, &network, &path.display().to_string())?;

			pairs.push((network.slug.clone(), network));
		}

		Ok(T::from_iter(pairs))
	}

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let network: Network = read_json_file(path)?;
		network.validate()?;
		Ok(network)
	}

	/// Ensures that:
	/// - name and slug are usable
	/// - at least one enabled `rpc` endpoint over http(s) exists
	/// - block time and cron schedule are sane
	fn validate(&self) -> Result<(), ConfigError> {
		if self.name.is_empty() {
			return Err(ConfigError::validation_error(
				"Network name is required",
				None,
				None,
			));
		}

		if self.slug.is_empty()
			|| !self
				.slug
				.chars()
				.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
		{
			return Err(ConfigError::validation_error(
				"Slug must contain only lowercase letters, numbers, and underscores",
				None,
				None,
			));
		}

		if !self.rpc_urls.iter().any(|rpc_url| rpc_url.weight > 0) {
			return Err(ConfigError::validation_error(
				"At least one RPC URL with a non-zero weight is required",
				None,
				None,
			));
		}

		if !self.rpc_urls.iter().all(|rpc_url| rpc_url.type_ == "rpc") {
			return Err(ConfigError::validation_error(
				"RPC URL type must be one of: rpc",
				None,
				None,
			));
		}

		if !self
			.rpc_urls
			.iter()
			.all(|rpc_url| rpc_url.url.starts_with("http://") || rpc_url.url.starts_with("https://"))
		{
			return Err(ConfigError::validation_error(
				"All RPC URLs must start with http:// or https://",
				None,
				None,
			));
		}

		if !self.rpc_urls.iter().all(|rpc_url| rpc_url.weight <= 100) {
			return Err(ConfigError::validation_error(
				"All RPC URL weights must be between 0 and 100",
				None,
				None,
			));
		}

		if self.block_time_ms < 100 {
			return Err(ConfigError::validation_error(
				"Block time must be at least 100ms",
				None,
				None,
			));
		}

		if let Err(e) = cron::Schedule::from_str(&self.cron_schedule) {
			return Err(ConfigError::validation_error(
				format!("Invalid cron schedule: {}", e),
				Some(Box::new(e)),
				None,
			));
		}

		if self.blocks_per_round() == 0 {
			tracing::warn!(
				network = %self.slug,
				"Rounds are scheduled more often than blocks are produced"
			);
		}

		for rpc_url in &self.rpc_urls {
			if rpc_url.url.starts_with("http://") {
				tracing::warn!(network = %self.slug, url = %rpc_url.url, "Insecure RPC URL");
			}
		}

		Ok(())
	}
}
