//! Derivation of queue jobs from marketplace and token logs.
//!
//! The agent and the client react to the same events with different jobs. Lookups that
//! find nothing produce no job; malformed logs and unknown events are errors.

use alloy::primitives::{Address, B256};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
	models::{
		ChainLogEvent, Closing, ClosingType, Contracts, Job, JobData, JobEthLog,
		JobRecordClosingData, JobType, RelatedType, Role,
	},
	repositories::{EntityRepositoryTrait, RepositoryError},
	services::jobsmaker::{
		events::{
			closing_type, decode, decode_channel_event, Approval, ChannelEvent, EventKind,
			LogChannelCreated, LogOfferingCreated, LogOfferingDeleted, LogOfferingPopedUp,
			Transfer,
		},
		JobsMakerError,
	},
};

/// Turns chain logs into jobs for one role.
///
/// Holds the closing counter that decides when rating jobs ask for re-aggregation,
/// so a single instance must serve all rounds of a process.
pub struct JobsMaker<E: EntityRepositoryTrait> {
	role: Role,
	contracts: Contracts,
	entities: Arc<E>,
	handlers: HashMap<B256, EventKind>,
	rate_after: u32,
	closings: u32,
}

fn lookup_failed(what: &'static str) -> impl FnOnce(RepositoryError) -> JobsMakerError {
	move |e| {
		JobsMakerError::lookup_error(format!("failed to look up {}", what), Some(Box::new(e)), None)
	}
}

fn payload<T: Serialize>(value: &T) -> Result<serde_json::Value, JobsMakerError> {
	serde_json::to_value(value).map_err(|e| JobsMakerError::Other(e.into()))
}

fn log_job(
	log: &ChainLogEvent,
	job_type: JobType,
	related_type: RelatedType,
	related_id: impl Into<String>,
) -> Result<Job, JobsMakerError> {
	let data = payload(&JobData {
		eth_log: JobEthLog::from(log),
	})?;
	Ok(Job::new(job_type, related_type, related_id, data))
}

fn fresh_id() -> String {
	Uuid::new_v4().to_string()
}

impl<E: EntityRepositoryTrait> JobsMaker<E> {
	pub fn new(role: Role, contracts: Contracts, entities: Arc<E>, rate_after: u32) -> Self {
		Self {
			role,
			contracts,
			entities,
			handlers: EventKind::dispatch_table(),
			rate_after,
			closings: 0,
		}
	}

	/// Jobs for `log`.
	///
	/// `in_flight` holds the jobs already derived earlier in the same round; they take
	/// part in offering resolution and supply-increment deduplication.
	#[instrument(skip_all, fields(role = %self.role, block = log.block_number, tx_hash = %log.tx_hash))]
	pub async fn jobs_for_log(
		&mut self,
		log: &ChainLogEvent,
		in_flight: &[Job],
	) -> Result<Vec<Job>, JobsMakerError> {
		let kind = log
			.signature()
			.and_then(|topic| self.handlers.get(topic))
			.copied()
			.ok_or_else(|| {
				JobsMakerError::unsupported_topic(
					"log does not match any monitored event",
					None,
					Some(HashMap::from([
						(
							"topic0".to_string(),
							log.signature()
								.map(|topic| format!("{:#x}", topic))
								.unwrap_or_default(),
						),
						("tx_hash".to_string(), log.tx_hash.clone()),
					])),
				)
			})?;

		tracing::debug!(event = %kind, "Deriving jobs");
		match self.role {
			Role::Agent => self.agent_jobs(kind, log).await,
			Role::Client => self.client_jobs(kind, log, in_flight).await,
		}
	}

	async fn agent_jobs(
		&mut self,
		kind: EventKind,
		log: &ChainLogEvent,
	) -> Result<Vec<Job>, JobsMakerError> {
		match kind {
			EventKind::ChannelCreated => {
				let event: LogChannelCreated = decode(log)?;
				let known = self
					.entities
					.find_offering_id(&event._offering_hash)
					.await
					.map_err(lookup_failed("offering"))?;
				if known.is_none() {
					tracing::warn!(offering = %event._offering_hash, "Channel created for unknown offering");
					return Ok(vec![]);
				}
				// The channel row does not exist yet; the job creates it under this id.
				Ok(vec![log_job(
					log,
					JobType::AgentAfterChannelCreate,
					RelatedType::Channel,
					fresh_id(),
				)?])
			}
			EventKind::ChannelToppedUp => {
				self.channel_jobs(kind, log, JobType::AgentAfterChannelTopUp)
					.await
			}
			EventKind::ChannelCloseRequested => {
				self.channel_jobs(kind, log, JobType::AgentAfterUncooperativeCloseRequest)
					.await
			}
			EventKind::CooperativeClose => {
				self.channel_jobs(kind, log, JobType::AgentAfterCooperativeClose)
					.await
			}
			EventKind::UncooperativeClose => {
				self.channel_jobs(kind, log, JobType::AgentAfterUncooperativeClose)
					.await
			}
			EventKind::OfferingCreated => {
				self.known_offering_jobs(kind, log, JobType::AgentAfterOfferingMsgBCPublish)
					.await
			}
			EventKind::OfferingDeleted => {
				self.known_offering_jobs(kind, log, JobType::AgentAfterOfferingDelete)
					.await
			}
			EventKind::OfferingPopedUp => {
				self.known_offering_jobs(kind, log, JobType::AgentAfterOfferingPopUp)
					.await
			}
			EventKind::TokenApproval => self.approval_jobs(log).await,
			EventKind::TokenTransfer => self.transfer_jobs(log).await,
		}
	}

	async fn client_jobs(
		&mut self,
		kind: EventKind,
		log: &ChainLogEvent,
		in_flight: &[Job],
	) -> Result<Vec<Job>, JobsMakerError> {
		match kind {
			EventKind::ChannelCreated => {
				let event: LogChannelCreated = decode(log)?;
				let mut jobs = Vec::new();
				match self
					.entities
					.find_channel_id_by_tx_hash(&log.tx_hash)
					.await
					.map_err(lookup_failed("channel"))?
				{
					Some(channel_id) => jobs.push(log_job(
						log,
						JobType::ClientAfterChannelCreate,
						RelatedType::Channel,
						channel_id,
					)?),
					None => tracing::warn!("Channel created by an unknown transaction"),
				}
				jobs.extend(
					self.supply_job(
						log,
						&event._offering_hash,
						JobType::DecrementCurrentSupply,
						in_flight,
					)
					.await?,
				);
				Ok(jobs)
			}
			EventKind::ChannelToppedUp => {
				self.channel_jobs(kind, log, JobType::ClientAfterChannelTopUp)
					.await
			}
			EventKind::ChannelCloseRequested => {
				self.channel_jobs(kind, log, JobType::ClientAfterUncooperativeCloseRequest)
					.await
			}
			EventKind::OfferingCreated => {
				let hash = offering_hash(kind, log)?;
				let id = self.offering_id(&hash).await?.unwrap_or_else(fresh_id);
				Ok(vec![log_job(
					log,
					JobType::ClientAfterOfferingMsgBCPublish,
					RelatedType::Offering,
					id,
				)?])
			}
			EventKind::OfferingPopedUp => {
				let hash = offering_hash(kind, log)?;
				let id = self.offering_id(&hash).await?.unwrap_or_else(fresh_id);
				Ok(vec![log_job(
					log,
					JobType::ClientAfterOfferingPopUp,
					RelatedType::Offering,
					id,
				)?])
			}
			EventKind::OfferingDeleted => {
				self.known_offering_jobs(kind, log, JobType::ClientAfterOfferingDelete)
					.await
			}
			EventKind::CooperativeClose => {
				self.closing_jobs(kind, log, JobType::ClientAfterCooperativeClose, in_flight)
					.await
			}
			EventKind::UncooperativeClose => {
				self.closing_jobs(kind, log, JobType::ClientAfterUncooperativeClose, in_flight)
					.await
			}
			EventKind::TokenApproval => self.approval_jobs(log).await,
			EventKind::TokenTransfer => self.transfer_jobs(log).await,
		}
	}

	/// Job on an existing channel identified by the log's open block.
	async fn channel_jobs(
		&self,
		kind: EventKind,
		log: &ChainLogEvent,
		job_type: JobType,
	) -> Result<Vec<Job>, JobsMakerError> {
		let event = channel_event(kind, log)?;
		Ok(self
			.channel_job(&event, log, job_type)
			.await?
			.into_iter()
			.collect())
	}

	async fn channel_job(
		&self,
		event: &ChannelEvent,
		log: &ChainLogEvent,
		job_type: JobType,
	) -> Result<Option<Job>, JobsMakerError> {
		match self
			.entities
			.find_channel_id(&event.key)
			.await
			.map_err(lookup_failed("channel"))?
		{
			Some(channel_id) => Ok(Some(log_job(log, job_type, RelatedType::Channel, channel_id)?)),
			None => {
				tracing::warn!(
					agent = %event.key.agent,
					client = %event.key.client,
					offering = %event.key.offering_hash,
					open_block = event.key.open_block,
					job_type = %job_type,
					"Channel not found"
				);
				Ok(None)
			}
		}
	}

	async fn offering_id(&self, hash: &B256) -> Result<Option<String>, JobsMakerError> {
		self.entities
			.find_offering_id(hash)
			.await
			.map_err(lookup_failed("offering"))
	}

	async fn known_offering_jobs(
		&self,
		kind: EventKind,
		log: &ChainLogEvent,
		job_type: JobType,
	) -> Result<Vec<Job>, JobsMakerError> {
		let hash = offering_hash(kind, log)?;
		match self.offering_id(&hash).await? {
			Some(id) => Ok(vec![log_job(log, job_type, RelatedType::Offering, id)?]),
			None => {
				tracing::debug!(offering = %hash, job_type = %job_type, "Offering not found");
				Ok(vec![])
			}
		}
	}

	async fn closing_jobs(
		&mut self,
		kind: EventKind,
		log: &ChainLogEvent,
		job_type: JobType,
		in_flight: &[Job],
	) -> Result<Vec<Job>, JobsMakerError> {
		let event = channel_event(kind, log)?;
		let closing = closing_type(kind).ok_or_else(|| {
			JobsMakerError::unsupported_topic(format!("{} is not a closing event", kind), None, None)
		})?;

		let mut jobs: Vec<Job> = self
			.channel_job(&event, log, job_type)
			.await?
			.into_iter()
			.collect();
		jobs.push(self.rate_job(&event, closing)?);

		let Some(increment) = self
			.supply_job(
				log,
				&event.key.offering_hash,
				JobType::IncrementCurrentSupply,
				in_flight,
			)
			.await?
		else {
			return Ok(jobs);
		};

		let already_created = match closing {
			ClosingType::Coop => {
				self.increment_exists(&event, EventKind::UncooperativeClose, in_flight, true)
					.await?
			}
			ClosingType::Uncoop => {
				self.increment_exists(&event, EventKind::CooperativeClose, in_flight, false)
					.await?
			}
		};
		if already_created {
			tracing::debug!(
				offering = %event.key.offering_hash,
				open_block = event.key.open_block,
				"Supply increment already queued for this closing"
			);
		} else {
			jobs.push(increment);
		}
		Ok(jobs)
	}

	/// Supply change on the offering `hash`.
	///
	/// Offerings the client only learned about from pending publish jobs are resolved
	/// through those jobs. Returns `None` when the offering cannot be resolved.
	async fn supply_job(
		&self,
		log: &ChainLogEvent,
		hash: &B256,
		job_type: JobType,
		in_flight: &[Job],
	) -> Result<Option<Job>, JobsMakerError> {
		let mut offering_id = self.offering_id(hash).await?;
		if offering_id.is_none() {
			offering_id = self
				.entities
				.find_offering_create_job_related_id(hash)
				.await
				.map_err(lookup_failed("offering job"))?;
		}
		if offering_id.is_none() {
			offering_id = in_flight
				.iter()
				.filter(|job| {
					matches!(
						job.job_type,
						JobType::ClientAfterOfferingMsgBCPublish | JobType::ClientAfterOfferingPopUp
					)
				})
				.find(|job| {
					job.eth_log()
						.is_some_and(|eth_log| eth_log.topics.get(2) == Some(hash))
				})
				.map(|job| job.related_id.clone());
		}

		match offering_id {
			Some(id) => Ok(Some(log_job(log, job_type, RelatedType::Offering, id)?)),
			None => {
				tracing::debug!(offering = %hash, job_type = %job_type, "Offering not resolved, skipping supply update");
				Ok(None)
			}
		}
	}

	/// Whether an `incrementCurrentSupply` job for the `other` close of the same channel
	/// is queued or derived earlier in this round.
	async fn increment_exists(
		&self,
		event: &ChannelEvent,
		other: EventKind,
		in_flight: &[Job],
		check_queued: bool,
	) -> Result<bool, JobsMakerError> {
		let topics = [
			other.signature_hash(),
			event.key.agent.into_word(),
			event.key.client.into_word(),
			event.key.offering_hash,
		];

		let mut candidates: Vec<JobEthLog> = in_flight
			.iter()
			.filter(|job| job.job_type == JobType::IncrementCurrentSupply)
			.filter_map(Job::eth_log)
			.filter(|eth_log| eth_log.topics.starts_with(&topics))
			.collect();
		if check_queued {
			candidates.extend(
				self.entities
					.find_increment_supply_logs(&topics)
					.await
					.map_err(lookup_failed("supply increment jobs"))?,
			);
		}

		Ok(candidates.iter().any(|eth_log| {
			let log = ChainLogEvent {
				block_number: eth_log.block,
				data: eth_log.data.clone(),
				topics: eth_log.topics.clone(),
				tx_hash: eth_log.tx_hash.clone(),
			};
			match decode_channel_event(other, &log) {
				Ok(Some(queued)) => queued.key.open_block == event.key.open_block,
				Ok(None) => false,
				Err(e) => {
					tracing::warn!(tx_hash = %eth_log.tx_hash, error = %e, "Ignoring undecodable queued closing");
					false
				}
			}
		}))
	}

	fn rate_job(
		&mut self,
		event: &ChannelEvent,
		closing_type: ClosingType,
	) -> Result<Job, JobsMakerError> {
		let id = fresh_id();
		let data = payload(&JobRecordClosingData {
			rec: Closing {
				id: id.clone(),
				closing_type,
				agent: event.key.agent,
				client: event.key.client,
				balance: event.balance.unwrap_or_default(),
				block: event.key.open_block,
			},
			update_ratings: self.record_closing(),
		})?;
		Ok(Job::new(
			JobType::ClientRecordClosing,
			RelatedType::Channel,
			id,
			data,
		))
	}

	/// Counts a closing; true once every `rate_after` closings.
	fn record_closing(&mut self) -> bool {
		self.closings += 1;
		if self.closings >= self.rate_after {
			self.closings = 0;
			return true;
		}
		false
	}

	async fn approval_jobs(&self, log: &ChainLogEvent) -> Result<Vec<Job>, JobsMakerError> {
		let event: Approval = decode(log)?;
		self.account_jobs(log, &[event.owner], JobType::AfterAccountAddBalanceApprove)
			.await
	}

	async fn transfer_jobs(&self, log: &ChainLogEvent) -> Result<Vec<Job>, JobsMakerError> {
		let event: Transfer = decode(log)?;
		let job_type = if event.from == self.contracts.marketplace {
			JobType::AfterAccountReturnBalance
		} else {
			JobType::AfterAccountAddBalance
		};
		self.account_jobs(log, &[event.from, event.to], job_type)
			.await
	}

	async fn account_jobs(
		&self,
		log: &ChainLogEvent,
		addresses: &[Address],
		job_type: JobType,
	) -> Result<Vec<Job>, JobsMakerError> {
		match self
			.entities
			.find_account_id(addresses)
			.await
			.map_err(lookup_failed("account"))?
		{
			Some(account_id) => Ok(vec![log_job(log, job_type, RelatedType::Account, account_id)?]),
			None => {
				tracing::debug!(job_type = %job_type, "Token event for foreign accounts");
				Ok(vec![])
			}
		}
	}
}

fn channel_event(kind: EventKind, log: &ChainLogEvent) -> Result<ChannelEvent, JobsMakerError> {
	decode_channel_event(kind, log)?.ok_or_else(|| {
		JobsMakerError::unsupported_topic(
			format!("{} does not name an open channel", kind),
			None,
			None,
		)
	})
}

fn offering_hash(kind: EventKind, log: &ChainLogEvent) -> Result<B256, JobsMakerError> {
	match kind {
		EventKind::OfferingCreated => Ok(decode::<LogOfferingCreated>(log)?._offering_hash),
		EventKind::OfferingDeleted => Ok(decode::<LogOfferingDeleted>(log)?._offering_hash),
		EventKind::OfferingPopedUp => Ok(decode::<LogOfferingPopedUp>(log)?._offering_hash),
		_ => Err(JobsMakerError::unsupported_topic(
			format!("{} is not an offering event", kind),
			None,
			None,
		)),
	}
}
