use alloy::primitives::{address, aliases::U192, Address, B256};
use std::{fs, path::Path, sync::Arc};
use tempfile::TempDir;

use crate::integration::mocks::MockChainClient;
use channel_monitor::{
	bootstrap::{create_monitoring_round, initialize_services, load_configuration, open_database},
	models::{Checkpoint, ConfigError, JobType, Role},
	repositories::{Database, JobRepository, SettingsRepository, SettingsRepositoryTrait},
	services::jobsmaker::LogChannelToppedUp,
	utils::tests::builders::log::LogBuilder,
};

const MARKETPLACE: &str = "0x1111111111111111111111111111111111111111";
const TOKEN: &str = "0x2222222222222222222222222222222222222222";
const AGENT: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const CLIENT: Address = address!("0xcccccccccccccccccccccccccccccccccccccccc");
const OFFERING: B256 = B256::repeat_byte(0xf1);

fn write_config(dir: &Path, role: &str, network_slug: &str, rpc_url: &str) {
	let database = dir.join("controller.db");
	fs::write(
		dir.join("monitor.json"),
		format!(
			r#"{{
				"network": "{network_slug}",
				"role": "{role}",
				"contracts": {{ "marketplace": "{MARKETPLACE}", "token": "{TOKEN}" }},
				"database_url": "sqlite://{}",
				"rate_after": 5,
				"request_timeout_ms": 2000
			}}"#,
			database.display()
		),
	)
	.unwrap();

	fs::create_dir_all(dir.join("networks")).unwrap();
	fs::write(
		dir.join("networks").join("test_network.json"),
		format!(
			r#"{{
				"slug": "test_network",
				"name": "Test Network",
				"chain_id": 1,
				"rpc_urls": [{{ "type_": "rpc", "url": "{rpc_url}", "weight": 100 }}],
				"block_time_ms": 12000,
				"cron_schedule": "0 */1 * * * *"
			}}"#
		),
	)
	.unwrap();
}

async fn seed_channel(database: &Database) {
	let pool = database.pool();
	sqlx::query("INSERT INTO accounts (id, eth_addr) VALUES ('acc-agent', ?)")
		.bind(format!("{:#x}", AGENT))
		.execute(pool)
		.await
		.unwrap();
	sqlx::query("INSERT INTO offerings (id, hash, agent) VALUES ('off-1', ?, ?)")
		.bind(format!("{:#x}", OFFERING))
		.bind(format!("{:#x}", AGENT))
		.execute(pool)
		.await
		.unwrap();
	sqlx::query("INSERT INTO channels (id, agent, client, offering, block) VALUES ('ch-1', ?, ?, 'off-1', 480)")
		.bind(format!("{:#x}", AGENT))
		.bind(format!("{:#x}", CLIENT))
		.execute(pool)
		.await
		.unwrap();
}

#[tokio::test]
async fn test_load_configuration() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "client", "test_network", "https://rpc.test.network");

	let config = load_configuration(dir.path()).await.unwrap();

	assert_eq!(config.monitor.role, Role::Client);
	assert_eq!(config.monitor.rate_after, 5);
	assert_eq!(config.network.slug, "test_network");
	assert_eq!(config.network.rpc_urls[0].url, "https://rpc.test.network");
}

#[tokio::test]
async fn test_load_configuration_unknown_network() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "agent", "mainnet", "https://rpc.test.network");

	let err = load_configuration(dir.path()).await.unwrap_err();

	match err {
		ConfigError::ValidationError(ctx) => {
			assert!(ctx.message.contains("Network 'mainnet' is not configured"));
		}
		other => panic!("expected ValidationError, got {:?}", other),
	}
}

#[tokio::test]
async fn test_load_configuration_missing_monitor_file() {
	let dir = TempDir::new().unwrap();

	assert!(matches!(
		load_configuration(dir.path()).await,
		Err(ConfigError::FileError(_))
	));
}

#[tokio::test]
async fn test_load_configuration_rejects_unknown_fields() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "agent", "test_network", "https://rpc.test.network");
	fs::write(
		dir.path().join("monitor.json"),
		r#"{ "network": "test_network", "role": "agent", "triggers": [] }"#,
	)
	.unwrap();

	assert!(matches!(
		load_configuration(dir.path()).await,
		Err(ConfigError::ParseError(_))
	));
}

#[tokio::test]
async fn test_create_monitoring_round_initializes_checkpoints() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "client", "test_network", "https://rpc.test.network");
	let config = load_configuration(dir.path()).await.unwrap();
	let database = open_database(&config.monitor.database_url).await.unwrap();

	create_monitoring_round(&config, Arc::new(MockChainClient::new()), &database)
		.await
		.unwrap();

	let settings = SettingsRepository::new(database.pool().clone());
	for checkpoint in [Checkpoint::LastProcessedBlock, Checkpoint::LastBackSearchBlock] {
		assert_eq!(settings.read_uint(checkpoint.key()).await.unwrap(), 0);
	}
	assert!(settings
		.read_uint(Checkpoint::ClientMonitoringStartBlock.key())
		.await
		.is_err());
}

#[tokio::test]
async fn test_rounds_advance_checkpoint_and_persist_jobs() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "agent", "test_network", "https://rpc.test.network");
	let config = load_configuration(dir.path()).await.unwrap();
	let database = open_database(&config.monitor.database_url).await.unwrap();
	seed_channel(&database).await;

	let top_up = LogBuilder::new()
		.event(&LogChannelToppedUp {
			_agent: AGENT,
			_client: CLIENT,
			_offering_hash: OFFERING,
			_open_block_number: 480,
			_added_deposit: U192::from(7u64),
		})
		.block_number(505)
		.build();

	let mut chain = MockChainClient::new();
	let mut heads = 0;
	chain.expect_get_latest_block_number().returning(move || {
		heads += 1;
		Ok(990 + 10 * heads)
	});
	chain.expect_filter_logs().returning(move |query| {
		let covers = query.from_block <= 505 && 505 <= query.to_block;
		if covers && query.topics.len() == 2 {
			Ok(vec![top_up.clone()])
		} else {
			Ok(vec![])
		}
	});

	let round = create_monitoring_round(&config, Arc::new(chain), &database)
		.await
		.unwrap();
	let settings = SettingsRepository::new(database.pool().clone());
	let jobs = JobRepository::new(database.pool().clone());
	let last_processed = Checkpoint::LastProcessedBlock.key();

	// Seeded settings: 12 confirmations, 500 block limit
	let first = round.round().await.unwrap();
	assert_eq!(first.latest_block, 1000);
	assert_eq!(settings.read_uint(last_processed).await.unwrap(), 988);

	let stored = jobs.list_jobs().await.unwrap();
	assert_eq!(stored.len(), 1);
	assert_eq!(stored[0].job_type, JobType::AgentAfterChannelTopUp);
	assert_eq!(stored[0].related_id, "ch-1");
	assert_eq!(stored[0], first.jobs[0]);

	let second = round.round().await.unwrap();
	assert_eq!(second.latest_block, 1010);
	assert!(second.jobs.is_empty());
	assert_eq!(settings.read_uint(last_processed).await.unwrap(), 998);
	assert_eq!(jobs.count_jobs().await.unwrap(), 1);

	database.close().await;
}

#[tokio::test]
async fn test_initialize_services_fails_without_reachable_endpoint() {
	let dir = TempDir::new().unwrap();
	write_config(dir.path(), "agent", "test_network", "http://127.0.0.1:1");
	let config = load_configuration(dir.path()).await.unwrap();

	let err = initialize_services(&config).await.err().unwrap();

	assert!(err
		.to_string()
		.contains("Failed to connect to network 'test_network'"));
}
