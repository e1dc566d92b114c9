//! Bootstrap module for loading configuration and wiring the monitor together.
//!
//! # Steps
//! - `load_configuration`: reads `monitor.json` and the network it names
//! - `open_database`: connects to the controller database and applies migrations
//! - `create_monitoring_round`: initializes checkpoints and builds the round over a chain client
//! - `initialize_services`: all of the above over the JSON-RPC client

use std::{collections::HashMap, error::Error, path::Path, sync::Arc, time::Duration};

use crate::{
	models::{ConfigError, ConfigLoader, MonitorConfig, Network},
	repositories::{
		Database, EntityRepository, JobRepository, RepositoryError, SettingsRepository,
		SettingsRepositoryTrait, BLOCK_LIMIT_KEY,
	},
	services::{
		blockchain::{ChainClient, EthClient, HttpTransportClient},
		blockwatcher::MonitoringRound,
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Monitoring round backed by the JSON-RPC client and the SQLite repositories
pub type ChannelMonitor<C = EthClient<HttpTransportClient>> =
	MonitoringRound<C, SettingsRepository, EntityRepository, JobRepository>;

/// Validated configuration the process runs with
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
	pub monitor: MonitorConfig,
	pub network: Network,
}

/// Loads `monitor.json` and `networks/*.json` from `config_dir`.
///
/// # Errors
/// Fails if either file set is invalid or no network has the configured slug.
pub async fn load_configuration(config_dir: &Path) -> std::result::Result<LoadedConfig, ConfigError> {
	let monitor = MonitorConfig::load_from_path(&config_dir.join("monitor.json")).await?;
	let networks: HashMap<String, Network> =
		Network::load_all(Some(&config_dir.join("networks"))).await?;

	let network = networks
		.into_values()
		.find(|network| network.slug == monitor.network)
		.ok_or_else(|| {
			ConfigError::validation_error(
				format!("Network '{}' is not configured", monitor.network),
				None,
				Some(HashMap::from([(
					"config_dir".to_string(),
					config_dir.display().to_string(),
				)])),
			)
		})?;

	Ok(LoadedConfig { monitor, network })
}

/// Connects to the controller database and applies pending migrations.
pub async fn open_database(database_url: &str) -> std::result::Result<Database, RepositoryError> {
	let database = Database::new(database_url).await?;
	database.run_migrations().await?;
	Ok(database)
}

/// Builds a monitoring round for `config` over `chain`.
///
/// Checkpoints the role reads are created with value 0 when absent.
pub async fn create_monitoring_round<C: ChainClient>(
	config: &LoadedConfig,
	chain: Arc<C>,
	database: &Database,
) -> std::result::Result<ChannelMonitor<C>, RepositoryError> {
	let pool = database.pool().clone();
	let settings = SettingsRepository::new(pool.clone());
	settings
		.init_checkpoints(ChannelMonitor::<C>::checkpoints(config.monitor.role))
		.await?;

	let block_limit = settings.read_uint(BLOCK_LIMIT_KEY).await?;
	let blocks_per_round = config.network.blocks_per_round();
	if block_limit != 0 && block_limit < blocks_per_round {
		tracing::warn!(
			block_limit,
			blocks_per_round,
			"Block limit is below the blocks produced per round, the monitor will fall behind"
		);
	}

	Ok(MonitoringRound::new(
		config.monitor.role,
		config.monitor.contracts,
		chain,
		Arc::new(settings),
		Arc::new(EntityRepository::new(pool.clone())),
		Arc::new(JobRepository::new(pool)),
		config.monitor.rate_after,
		Duration::from_millis(config.monitor.request_timeout_ms),
	))
}

/// Opens the database, connects to the network and builds the monitoring round.
///
/// # Errors
/// Returns an error if the database or every RPC endpoint is unreachable.
pub async fn initialize_services(config: &LoadedConfig) -> Result<(Database, Arc<ChannelMonitor>)> {
	let database = open_database(&config.monitor.database_url).await?;

	let chain = EthClient::new(
		&config.network,
		Duration::from_millis(config.monitor.request_timeout_ms),
	)
	.await
	.map_err(|e| {
		format!(
			"Failed to connect to network '{}': {}",
			config.network.slug, e
		)
	})?;

	let round = create_monitoring_round(config, Arc::new(chain), &database).await?;
	Ok((database, Arc::new(round)))
}
