//! Channel monitor entry point.
//!
//! Watches the marketplace and token contracts for logs that concern this node's
//! accounts and queues the jobs they call for.
//!
//! # Flow
//! 1. Loads `monitor.json` and the network it names from the configuration directory
//! 2. Opens the controller database and connects to the network's RPC endpoints
//! 3. Runs a monitoring round on every tick of the network's cron schedule
//! 4. On Ctrl+C stops scheduling, waits for a round in flight and closes the database

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use crate::{
	bootstrap::{initialize_services, load_configuration, Result},
	services::{
		blockchain::{EthClient, HttpTransportClient},
		blockwatcher::BlockWatcherService,
	},
	repositories::{EntityRepository, JobRepository, SettingsRepository},
	utils::{logging::setup_logging, parse_string_to_bytes_size},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
};
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info};

const DEFAULT_CONFIG_DIR: &str = "config";

#[derive(Parser)]
#[command(
	name = "channel-monitor",
	about = "Watches payment channel marketplace contracts and queues the jobs their events call for.",
	version
)]
struct Cli {
	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Directory holding monitor.json and networks/ (default: config/)
	#[arg(long, value_name = "PATH")]
	config_dir: Option<String>,

	/// Validate configuration files without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		// Values from .env override the inherited environment
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}

		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if let Some(dir) = &self.config_dir {
			set_var("CONFIG_DIR", dir);
		}
	}

	fn config_dir() -> PathBuf {
		PathBuf::from(var("CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string()))
	}
}

type MonitorService = BlockWatcherService<
	EthClient<HttpTransportClient>,
	SettingsRepository,
	EntityRepository,
	JobRepository,
	JobScheduler,
>;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	let config_dir = Cli::config_dir();
	let config = match load_configuration(&config_dir).await {
		Ok(config) => config,
		Err(e) => {
			error!("Configuration in {} is invalid: {}", config_dir.display(), e);
			return Err(e.into());
		}
	};

	if cli.check {
		info!(
			network = %config.network.slug,
			role = %config.monitor.role,
			"Configuration is valid"
		);
		return Ok(());
	}

	let (database, round) = initialize_services(&config).await?;

	let mut service =
		MonitorService::new(round, config.network.cron_schedule.clone()).await?;
	service.start().await?;

	info!(
		network = %config.network.slug,
		role = %config.monitor.role,
		"Service started. Press Ctrl+C to shutdown"
	);

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", e);
	}
	info!("Shutdown signal received, stopping services...");

	if let Err(e) = service.stop().await {
		error!("Error during shutdown: {}", e);
	}
	database.close().await;

	info!("Shutdown complete");
	Ok(())
}
