//! Configuration loading and validation.
//!
//! Networks are read from `config/networks/*.json`, the monitor itself from
//! `config/monitor.json`.

#![allow(clippy::result_large_err)]

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

mod error;
mod monitor_config;
mod network_config;

pub use error::ConfigError;

/// Common interface for loading configuration files
#[async_trait]
pub trait ConfigLoader: Sized + Send {
	/// Directory read by [`ConfigLoader::load_all`] when no path is given
	const DEFAULT_DIR: &'static str;

	/// Load all configuration files from a directory, keyed by file stem
	///
	/// If no path is provided, uses [`ConfigLoader::DEFAULT_DIR`].
	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let dir = path.unwrap_or(Path::new(Self::DEFAULT_DIR));
		if !dir.exists() {
			return Err(ConfigError::file_error(
				"configuration directory not found",
				None,
				path_metadata(dir),
			));
		}

		let mut pairs = Vec::new();
		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();
			if !Self::is_json_file(&path) {
				continue;
			}
			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();
			pairs.push((name, Self::load_from_path(&path).await?));
		}

		Ok(T::from_iter(pairs))
	}

	/// Load configuration from a specific file path
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Validate the configuration
	fn validate(&self) -> Result<(), ConfigError>;

	/// Check if a file is a JSON file based on extension
	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}

pub(crate) fn path_metadata(path: &Path) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"path".to_string(),
		path.display().to_string(),
	)]))
}

/// Reads and deserializes one JSON configuration file
pub(crate) fn read_json_file<C: serde::de::DeserializeOwned>(path: &Path) -> Result<C, ConfigError> {
	let file = std::fs::File::open(path).map_err(|e| {
		ConfigError::file_error(
			format!("failed to open config file: {}", e),
			Some(Box::new(e)),
			path_metadata(path),
		)
	})?;

	serde_json::from_reader(file).map_err(|e| {
		ConfigError::parse_error(
			format!("failed to parse config file: {}", e),
			Some(Box::new(e)),
			path_metadata(path),
		)
	})
}
