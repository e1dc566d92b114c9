//! Monitoring rounds and the scheduler that drives them.
//!
//! A round reads the chain head, builds the role's filters, turns the matching logs
//! into jobs and commits the jobs together with the advanced checkpoints.

use anyhow::Context;
use std::{
	collections::{HashMap, HashSet},
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::instrument;

use crate::{
	models::{Checkpoint, ChainLogEvent, Contracts, Job, Role, RoundCommit},
	repositories::{EntityRepositoryTrait, RepositoryError, RoundStore, SettingsRepositoryTrait},
	services::{
		blockchain::ChainClient,
		blockwatcher::{
			error::BlockWatcherError,
			queries::{agent_queries, client_queries, RoundPlan},
			range::{read_offerings_range_of_interest, read_range_of_interest},
		},
		jobsmaker::JobsMaker,
	},
};

/// Trait for job scheduler
///
/// Abstracts the cron scheduler so the monitor can be driven by a test double.
#[async_trait::async_trait]
pub trait JobSchedulerTrait: Send + Sync + Sized {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>;
	async fn add(&self, job: CronJob) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait::async_trait]
impl JobSchedulerTrait for JobScheduler {
	async fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		Self::new().await.map_err(Into::into)
	}

	async fn add(&self, job: CronJob) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.add(job).await.map(|_| ()).map_err(Into::into)
	}

	async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.start().await.map(|_| ()).map_err(Into::into)
	}

	async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		self.shutdown().await.map(|_| ()).map_err(Into::into)
	}
}

/// Outcome of a committed round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundSummary {
	pub latest_block: u64,
	pub queries: usize,
	pub logs: usize,
	pub jobs: Vec<Job>,
	pub commit: RoundCommit,
}

/// One monitoring round over a chain client and the controller database.
///
/// Rounds are serialized: the job maker sits behind a mutex that a round holds from
/// the first chain call until its commit returns.
pub struct MonitoringRound<C, S, E, R>
where
	E: EntityRepositoryTrait,
{
	role: Role,
	contracts: Contracts,
	chain: Arc<C>,
	settings: Arc<S>,
	entities: Arc<E>,
	store: Arc<R>,
	jobs_maker: Mutex<JobsMaker<E>>,
	request_timeout: Duration,
}

impl<C, S, E, R> MonitoringRound<C, S, E, R>
where
	C: ChainClient,
	S: SettingsRepositoryTrait,
	E: EntityRepositoryTrait,
	R: RoundStore,
{
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		role: Role,
		contracts: Contracts,
		chain: Arc<C>,
		settings: Arc<S>,
		entities: Arc<E>,
		store: Arc<R>,
		rate_after: u32,
		request_timeout: Duration,
	) -> Self {
		let jobs_maker = JobsMaker::new(role, contracts, entities.clone(), rate_after);
		Self {
			role,
			contracts,
			chain,
			settings,
			entities,
			store,
			jobs_maker: Mutex::new(jobs_maker),
			request_timeout,
		}
	}

	/// Checkpoints read by rounds of `role`
	pub fn checkpoints(role: Role) -> &'static [Checkpoint] {
		match role {
			Role::Agent => &[Checkpoint::LastProcessedBlock],
			Role::Client => &[
				Checkpoint::LastProcessedBlock,
				Checkpoint::LastBackSearchBlock,
			],
		}
	}

	/// Runs a round, waiting for a round in flight to finish first.
	pub async fn round(&self) -> Result<RoundSummary, BlockWatcherError> {
		let mut jobs_maker = self.jobs_maker.lock().await;
		self.run(&mut jobs_maker).await
	}

	/// Runs a round unless one is in flight, in which case `Ok(None)` is returned.
	pub async fn try_round(&self) -> Result<Option<RoundSummary>, BlockWatcherError> {
		let Ok(mut jobs_maker) = self.jobs_maker.try_lock() else {
			tracing::debug!(role = %self.role, "Previous round still running, skipping tick");
			return Ok(None);
		};
		self.run(&mut jobs_maker).await.map(Some)
	}

	/// Waits until no round is in flight.
	pub async fn wait_idle(&self) {
		drop(self.jobs_maker.lock().await);
	}

	async fn with_timeout<T, F>(&self, what: &str, call: F) -> Result<T, BlockWatcherError>
	where
		F: Future<Output = Result<T, anyhow::Error>>,
	{
		match tokio::time::timeout(self.request_timeout, call).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => Err(BlockWatcherError::network_error(
				format!("Failed to {}", what),
				Some(e.into()),
				None,
			)),
			Err(elapsed) => Err(BlockWatcherError::network_error(
				format!("Timed out trying to {}", what),
				Some(Box::new(elapsed)),
				Some(HashMap::from([(
					"timeout_ms".to_string(),
					self.request_timeout.as_millis().to_string(),
				)])),
			)),
		}
	}

	async fn plan(&self, latest: u64) -> Result<RoundPlan, BlockWatcherError> {
		let storage = |what: &'static str| {
			move |e: RepositoryError| {
				BlockWatcherError::storage_error(what, Some(Box::new(e)), None)
			}
		};

		let accounts = self
			.entities
			.in_use_addresses()
			.await
			.map_err(storage("Failed to read accounts in use"))?;
		if accounts.is_empty() {
			tracing::debug!(role = %self.role, "No accounts in use");
			return Ok(RoundPlan::nothing());
		}

		let range = read_range_of_interest(self.settings.as_ref(), latest)
			.await
			.map_err(storage("Failed to compute range of interest"))?;

		match self.role {
			Role::Agent => Ok(agent_queries(range, &self.contracts, &accounts)),
			Role::Client => {
				let start = self
					.settings
					.insert_if_absent(Checkpoint::ClientMonitoringStartBlock.key(), latest)
					.await
					.map_err(storage("Failed to read monitoring start block"))?;
				let offerings = read_offerings_range_of_interest(self.settings.as_ref(), start)
					.await
					.map_err(storage("Failed to compute offerings range of interest"))?;
				tracing::debug!(range = %range, offerings = %offerings, "Client windows");
				Ok(client_queries(range, offerings, &self.contracts, &accounts))
			}
		}
	}

	#[instrument(skip_all, fields(role = %self.role))]
	async fn run(&self, jobs_maker: &mut JobsMaker<E>) -> Result<RoundSummary, BlockWatcherError> {
		let start_time = Instant::now();

		let latest_block = self
			.with_timeout("get latest block number", self.chain.get_latest_block_number())
			.await?;
		let plan = self.plan(latest_block).await?;
		if plan.is_empty() {
			tracing::debug!(latest_block, "Nothing to scan");
			return Ok(RoundSummary {
				latest_block,
				..Default::default()
			});
		}

		let mut jobs: Vec<Job> = Vec::new();
		let mut seen: HashSet<ChainLogEvent> = HashSet::new();
		let mut logs = 0;
		for query in &plan.queries {
			let found = self
				.with_timeout("filter logs", self.chain.filter_logs(query))
				.await?;

			// A log matched by an earlier filter of this round is already handled.
			let fresh: Vec<ChainLogEvent> =
				found.into_iter().filter(|log| !seen.contains(log)).collect();
			for log in &fresh {
				let derived = jobs_maker.jobs_for_log(log, &jobs).await.map_err(|e| {
					BlockWatcherError::processing_error(
						"Failed to derive jobs from log",
						Some(Box::new(e)),
						Some(HashMap::from([
							("tx_hash".to_string(), log.tx_hash.clone()),
							("block".to_string(), log.block_number.to_string()),
						])),
					)
				})?;
				jobs.extend(derived);
			}
			logs += fresh.len();
			seen.extend(fresh);
		}

		self.store
			.commit_round(&jobs, &plan.commit)
			.await
			.map_err(|e| {
				BlockWatcherError::storage_error(
					"Failed to commit round",
					Some(Box::new(e)),
					Some(HashMap::from([("jobs".to_string(), jobs.len().to_string())])),
				)
			})?;

		tracing::info!(
			latest_block,
			queries = plan.queries.len(),
			logs,
			jobs = jobs.len(),
			last_processed = ?plan.commit.get(Checkpoint::LastProcessedBlock),
			last_back_search = ?plan.commit.get(Checkpoint::LastBackSearchBlock),
			elapsed_ms = start_time.elapsed().as_millis() as u64,
			"Round committed"
		);

		Ok(RoundSummary {
			latest_block,
			queries: plan.queries.len(),
			logs,
			jobs,
			commit: plan.commit,
		})
	}
}

/// Runs [`MonitoringRound`]s on a cron schedule.
pub struct BlockWatcherService<C, S, E, R, J>
where
	E: EntityRepositoryTrait,
	J: JobSchedulerTrait,
{
	pub round: Arc<MonitoringRound<C, S, E, R>>,
	pub cron_schedule: String,
	scheduler: J,
}

impl<C, S, E, R, J> BlockWatcherService<C, S, E, R, J>
where
	C: ChainClient + 'static,
	S: SettingsRepositoryTrait + 'static,
	E: EntityRepositoryTrait + 'static,
	R: RoundStore + 'static,
	J: JobSchedulerTrait,
{
	pub async fn new(
		round: Arc<MonitoringRound<C, S, E, R>>,
		cron_schedule: impl Into<String>,
	) -> Result<Self, BlockWatcherError> {
		let scheduler = J::new()
			.await
			.map_err(|e| BlockWatcherError::scheduler_error(e.to_string(), Some(e), None))?;
		Ok(Self {
			round,
			cron_schedule: cron_schedule.into(),
			scheduler,
		})
	}

	/// Schedules a round on every tick. Ticks that fire during a round are skipped.
	pub async fn start(&mut self) -> Result<(), BlockWatcherError> {
		let round = self.round.clone();
		let job = CronJob::new_async(self.cron_schedule.as_str(), move |_uuid, _l| {
			let round = round.clone();
			Box::pin(async move {
				// A failed round commits nothing; the next tick retries it.
				if let Err(e) = round.try_round().await {
					tracing::error!(error = %e, "Monitoring round failed");
				}
			})
		})
		.with_context(|| format!("Failed to create job for schedule '{}'", self.cron_schedule))?;

		let metadata = || {
			Some(HashMap::from([(
				"cron_schedule".to_string(),
				self.cron_schedule.clone(),
			)]))
		};
		self.scheduler
			.add(job)
			.await
			.map_err(|e| BlockWatcherError::scheduler_error(e.to_string(), Some(e), metadata()))?;
		self.scheduler
			.start()
			.await
			.map_err(|e| BlockWatcherError::scheduler_error(e.to_string(), Some(e), metadata()))?;

		tracing::info!(schedule = %self.cron_schedule, "Started channel monitor");
		Ok(())
	}

	/// Stops scheduling rounds and waits for a round in flight to commit.
	pub async fn stop(&mut self) -> Result<(), BlockWatcherError> {
		self.scheduler
			.shutdown()
			.await
			.map_err(|e| BlockWatcherError::scheduler_error(e.to_string(), Some(e), None))?;
		self.round.wait_idle().await;

		tracing::info!("Stopped channel monitor");
		Ok(())
	}
}
