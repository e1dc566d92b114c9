use alloy::primitives::{address, aliases::U192, Address, B256, U256};
use async_trait::async_trait;
use mockall::predicate;
use std::{sync::Arc, time::Duration};
use tokio::sync::Notify;

use crate::integration::mocks::{
	MockChainClient, MockEntityRepository, MockRoundStore, MockSettingsRepository,
};
use channel_monitor::{
	models::{ChainLogEvent, Checkpoint, Contracts, FilterQuery, JobType, RelatedType, Role},
	repositories::{RepositoryError, BLOCK_LIMIT_KEY, FRESH_OFFERINGS_KEY, MIN_CONFIRMATIONS_KEY},
	services::{
		blockchain::ChainClient,
		blockwatcher::{BlockWatcherError, MonitoringRound, RoundSummary},
		jobsmaker::{LogChannelToppedUp, LogOfferingCreated, Transfer},
	},
	utils::tests::builders::log::LogBuilder,
};

const CONTRACTS: Contracts = Contracts {
	marketplace: address!("0x1111111111111111111111111111111111111111"),
	token: address!("0x2222222222222222222222222222222222222222"),
};
const AGENT: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const CLIENT: Address = address!("0xcccccccccccccccccccccccccccccccccccccccc");
const OFFERING: B256 = B256::repeat_byte(0xf1);

/// Settings with 10 confirmations, a 10 block limit and a 600 block fresh horizon
fn settings(last_processed: u64, last_back_search: u64) -> MockSettingsRepository {
	let mut settings = MockSettingsRepository::new();
	settings.expect_read_uint().returning(move |key| match key {
		MIN_CONFIRMATIONS_KEY => Ok(10),
		BLOCK_LIMIT_KEY => Ok(10),
		FRESH_OFFERINGS_KEY => Ok(600),
		k if k == Checkpoint::LastProcessedBlock.key() => Ok(last_processed),
		k if k == Checkpoint::LastBackSearchBlock.key() => Ok(last_back_search),
		other => Err(RepositoryError::not_found(
			format!("setting {} not found", other),
			None,
			None,
		)),
	});
	settings
}

fn accounts(addresses: Vec<Address>) -> MockEntityRepository {
	let mut entities = MockEntityRepository::new();
	entities
		.expect_in_use_addresses()
		.returning(move || Ok(addresses.clone()));
	entities
}

fn chain(latest: u64) -> MockChainClient {
	let mut chain = MockChainClient::new();
	chain
		.expect_get_latest_block_number()
		.returning(move || Ok(latest));
	chain
}

fn round<C: ChainClient>(
	role: Role,
	chain: C,
	settings: MockSettingsRepository,
	entities: MockEntityRepository,
	store: MockRoundStore,
) -> MonitoringRound<C, MockSettingsRepository, MockEntityRepository, MockRoundStore> {
	MonitoringRound::new(
		role,
		CONTRACTS,
		Arc::new(chain),
		Arc::new(settings),
		Arc::new(entities),
		Arc::new(store),
		10,
		Duration::from_secs(5),
	)
}

fn top_up_log() -> ChainLogEvent {
	LogBuilder::new()
		.event(&LogChannelToppedUp {
			_agent: AGENT,
			_client: CLIENT,
			_offering_hash: OFFERING,
			_open_block_number: 480,
			_added_deposit: U192::from(5u64),
		})
		.block_number(505)
		.build()
}

fn transfer_to_agent_log() -> ChainLogEvent {
	LogBuilder::new()
		.event(&Transfer {
			from: CLIENT,
			to: AGENT,
			value: U256::from(100u64),
		})
		.block_number(507)
		.tx_hash(B256::repeat_byte(0x07))
		.build()
}

fn no_commit() -> MockRoundStore {
	let mut store = MockRoundStore::new();
	store.expect_commit_round().times(0);
	store
}

#[tokio::test]
async fn test_agent_round_commits_jobs_with_checkpoint() {
	let mut chain = chain(1000);
	chain
		.expect_filter_logs()
		.times(2)
		.returning(|query: &FilterQuery| {
			assert_eq!((query.from_block, query.to_block), (501, 511));
			// Only the first agent filter constrains topic 1
			if query.topics.len() == 2 {
				Ok(vec![top_up_log()])
			} else {
				Ok(vec![])
			}
		});

	let mut entities = accounts(vec![AGENT]);
	entities
		.expect_find_channel_id()
		.withf(|key| key.open_block == 480 && key.agent == AGENT && key.offering_hash == OFFERING)
		.returning(|_| Ok(Some("ch-1".to_string())));

	let mut store = MockRoundStore::new();
	store
		.expect_commit_round()
		.withf(|jobs, commit| {
			jobs.len() == 1
				&& jobs[0].job_type == JobType::AgentAfterChannelTopUp
				&& jobs[0].related_id == "ch-1"
				&& commit.get(Checkpoint::LastProcessedBlock) == Some(511)
				&& commit.get(Checkpoint::LastBackSearchBlock).is_none()
		})
		.times(1)
		.returning(|_, _| Ok(()));

	let round = round(Role::Agent, chain, settings(500, 0), entities, store);
	let summary = round.round().await.unwrap();

	assert_eq!(summary.latest_block, 1000);
	assert_eq!(summary.queries, 2);
	assert_eq!(summary.logs, 1);
	assert_eq!(summary.jobs.len(), 1);
	assert_eq!(summary.jobs[0].related_type, RelatedType::Channel);
}

#[tokio::test]
async fn test_log_matched_by_two_filters_is_handled_once() {
	let mut chain = chain(1000);
	chain
		.expect_filter_logs()
		.times(2)
		.returning(|_| Ok(vec![transfer_to_agent_log()]));

	let mut entities = accounts(vec![AGENT]);
	entities
		.expect_find_account_id()
		.with(predicate::eq(vec![CLIENT, AGENT]))
		.times(1)
		.returning(|_| Ok(Some("acc-agent".to_string())));

	let mut store = MockRoundStore::new();
	store
		.expect_commit_round()
		.withf(|jobs, _| jobs.len() == 1 && jobs[0].job_type == JobType::AfterAccountAddBalance)
		.times(1)
		.returning(|_, _| Ok(()));

	let round = round(Role::Agent, chain, settings(500, 0), entities, store);
	let summary = round.round().await.unwrap();

	assert_eq!(summary.logs, 1);
	assert_eq!(summary.jobs.len(), 1);
}

#[tokio::test]
async fn test_round_without_accounts_commits_nothing() {
	let mut chain = chain(1000);
	chain.expect_filter_logs().times(0);

	let round = round(
		Role::Client,
		chain,
		MockSettingsRepository::new(),
		accounts(vec![]),
		no_commit(),
	);
	let summary = round.round().await.unwrap();

	assert_eq!(
		summary,
		RoundSummary {
			latest_block: 1000,
			..Default::default()
		}
	);
}

#[tokio::test]
async fn test_round_at_chain_head_commits_nothing() {
	let mut chain = chain(1000);
	chain.expect_filter_logs().times(0);

	// Blocks up to 990 are processed and 990 is the last confirmed block
	let round = round(
		Role::Agent,
		chain,
		settings(990, 0),
		accounts(vec![AGENT]),
		no_commit(),
	);
	let summary = round.round().await.unwrap();

	assert_eq!(summary.queries, 0);
	assert!(summary.commit.is_empty());
}

#[tokio::test]
async fn test_client_round_scans_forward_and_backward() {
	let offering_log = LogBuilder::new()
		.event(&LogOfferingCreated {
			_agent: AGENT,
			_offering_hash: OFFERING,
			_min_deposit: U256::from(10u64),
			_current_supply: 3,
		})
		.block_number(495)
		.build();

	let mut chain = chain(1000);
	chain.expect_filter_logs().times(4).returning(move |query| {
		if query.from_block == 489 {
			assert_eq!(query.to_block, 499);
			Ok(vec![offering_log.clone()])
		} else {
			assert_eq!((query.from_block, query.to_block), (501, 511));
			Ok(vec![])
		}
	});

	let mut settings = settings(500, 500);
	settings
		.expect_insert_if_absent()
		.with(
			predicate::eq(Checkpoint::ClientMonitoringStartBlock.key()),
			predicate::eq(1000),
		)
		.times(1)
		.returning(|_, _| Ok(1003));

	let mut entities = accounts(vec![CLIENT]);
	entities
		.expect_find_offering_id()
		.with(predicate::eq(OFFERING))
		.returning(|_| Ok(None));

	let mut store = MockRoundStore::new();
	store
		.expect_commit_round()
		.withf(|jobs, commit| {
			jobs.len() == 1
				&& jobs[0].job_type == JobType::ClientAfterOfferingMsgBCPublish
				&& commit.get(Checkpoint::LastProcessedBlock) == Some(511)
				&& commit.get(Checkpoint::LastBackSearchBlock) == Some(489)
		})
		.times(1)
		.returning(|_, _| Ok(()));

	let round = round(Role::Client, chain, settings, entities, store);
	let summary = round.round().await.unwrap();

	assert_eq!(summary.queries, 4);
	assert_eq!(summary.logs, 1);
	assert_eq!(summary.jobs[0].related_type, RelatedType::Offering);
}

#[tokio::test]
async fn test_latest_block_failure_aborts_round() {
	let mut chain = MockChainClient::new();
	chain
		.expect_get_latest_block_number()
		.returning(|| Err(anyhow::anyhow!("connection refused")));

	let mut entities = MockEntityRepository::new();
	entities.expect_in_use_addresses().times(0);

	let round = round(
		Role::Agent,
		chain,
		MockSettingsRepository::new(),
		entities,
		no_commit(),
	);
	let err = round.round().await.unwrap_err();

	assert!(matches!(err, BlockWatcherError::NetworkError(_)));
}

#[tokio::test]
async fn test_filter_failure_commits_nothing() {
	let mut chain = chain(1000);
	chain
		.expect_filter_logs()
		.times(1)
		.returning(|_| Err(anyhow::anyhow!("query returned more than 10000 results")));

	let round = round(
		Role::Agent,
		chain,
		settings(500, 0),
		accounts(vec![AGENT]),
		no_commit(),
	);
	let err = round.round().await.unwrap_err();

	assert!(matches!(err, BlockWatcherError::NetworkError(_)));
}

#[tokio::test]
async fn test_unknown_topic_aborts_round() {
	let mut chain = chain(1000);
	chain.expect_filter_logs().returning(|_| {
		Ok(vec![LogBuilder::new()
			.topics(vec![B256::repeat_byte(0x99), AGENT.into_word()])
			.block_number(502)
			.build()])
	});

	let round = round(
		Role::Agent,
		chain,
		settings(500, 0),
		accounts(vec![AGENT]),
		no_commit(),
	);
	let err = round.round().await.unwrap_err();

	match err {
		BlockWatcherError::ProcessingError(ctx) => {
			let block = ctx.metadata.as_ref().and_then(|m| m.get("block"));
			assert_eq!(block.map(String::as_str), Some("502"));
		}
		other => panic!("expected ProcessingError, got {:?}", other),
	}
}

#[tokio::test]
async fn test_commit_failure_is_storage_error() {
	let mut chain = chain(1000);
	chain.expect_filter_logs().returning(|_| Ok(vec![]));

	let mut store = MockRoundStore::new();
	store.expect_commit_round().times(1).returning(|_, _| {
		Err(RepositoryError::database_error(
			"database is locked",
			None,
			None,
		))
	});

	let round = round(
		Role::Agent,
		chain,
		settings(500, 0),
		accounts(vec![AGENT]),
		store,
	);
	let err = round.round().await.unwrap_err();

	assert!(matches!(err, BlockWatcherError::StorageError(_)));
}

#[tokio::test]
async fn test_settings_failure_is_storage_error() {
	let mut settings = MockSettingsRepository::new();
	settings.expect_read_uint().returning(|key| {
		Err(RepositoryError::not_found(
			format!("setting {} not found", key),
			None,
			None,
		))
	});

	let round = round(
		Role::Agent,
		chain(1000),
		settings,
		accounts(vec![AGENT]),
		no_commit(),
	);
	let err = round.round().await.unwrap_err();

	assert!(matches!(err, BlockWatcherError::StorageError(_)));
}

/// Chain whose head request never answers
struct StalledChain;

#[async_trait]
impl ChainClient for StalledChain {
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error> {
		tokio::time::sleep(Duration::from_secs(3600)).await;
		Ok(0)
	}

	async fn filter_logs(&self, _query: &FilterQuery) -> Result<Vec<ChainLogEvent>, anyhow::Error> {
		Ok(vec![])
	}
}

#[tokio::test]
async fn test_stalled_chain_call_times_out() {
	let round = MonitoringRound::new(
		Role::Agent,
		CONTRACTS,
		Arc::new(StalledChain),
		Arc::new(MockSettingsRepository::new()),
		Arc::new(MockEntityRepository::new()),
		Arc::new(no_commit()),
		10,
		Duration::from_millis(50),
	);

	let err = round.round().await.unwrap_err();

	match err {
		BlockWatcherError::NetworkError(ctx) => {
			assert!(ctx.message.contains("Timed out"));
			let timeout = ctx.metadata.as_ref().and_then(|m| m.get("timeout_ms"));
			assert_eq!(timeout.map(String::as_str), Some("50"));
		}
		other => panic!("expected NetworkError, got {:?}", other),
	}
}

/// Chain whose head request waits until the test opens the gate
struct GatedChain {
	entered: Arc<Notify>,
	gate: Arc<Notify>,
}

#[async_trait]
impl ChainClient for GatedChain {
	async fn get_latest_block_number(&self) -> Result<u64, anyhow::Error> {
		self.entered.notify_one();
		self.gate.notified().await;
		Ok(1000)
	}

	async fn filter_logs(&self, _query: &FilterQuery) -> Result<Vec<ChainLogEvent>, anyhow::Error> {
		Ok(vec![])
	}
}

#[tokio::test]
async fn test_tick_during_round_is_skipped() {
	let entered = Arc::new(Notify::new());
	let gate = Arc::new(Notify::new());
	let chain = GatedChain {
		entered: entered.clone(),
		gate: gate.clone(),
	};

	let round = Arc::new(MonitoringRound::new(
		Role::Agent,
		CONTRACTS,
		Arc::new(chain),
		Arc::new(MockSettingsRepository::new()),
		Arc::new(accounts(vec![])),
		Arc::new(no_commit()),
		10,
		Duration::from_secs(5),
	));

	let in_flight = tokio::spawn({
		let round = round.clone();
		async move { round.try_round().await }
	});
	entered.notified().await;

	assert!(round.try_round().await.unwrap().is_none());

	gate.notify_one();
	let summary = in_flight.await.unwrap().unwrap();
	assert_eq!(summary.map(|s| s.latest_block), Some(1000));

	round.wait_idle().await;
}
