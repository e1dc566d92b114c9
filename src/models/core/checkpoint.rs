use std::fmt;

/// Persisted scan checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
	/// Highest block whose logs have been turned into jobs
	LastProcessedBlock,
	/// Lowest block reached by the client's backward offering search
	LastBackSearchBlock,
	/// Chain height when the client first ran, anchor of the backward search
	ClientMonitoringStartBlock,
}

impl Checkpoint {
	pub fn key(&self) -> &'static str {
		match self {
			Checkpoint::LastProcessedBlock => "eth.event.lastProcessedBlock",
			Checkpoint::LastBackSearchBlock => "eth.event.lastBackSearchBlock",
			Checkpoint::ClientMonitoringStartBlock => "eth.event.clientMonitoringStartBlock",
		}
	}
}

impl fmt::Display for Checkpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

/// Checkpoint writes to apply in the same transaction as a round's jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundCommit {
	pub updates: Vec<(Checkpoint, u64)>,
}

impl RoundCommit {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn set(mut self, checkpoint: Checkpoint, block: u64) -> Self {
		self.updates.push((checkpoint, block));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.updates.is_empty()
	}

	/// Value this commit writes to `checkpoint`, if any
	pub fn get(&self, checkpoint: Checkpoint) -> Option<u64> {
		self.updates
			.iter()
			.rev()
			.find(|(c, _)| *c == checkpoint)
			.map(|(_, block)| *block)
	}
}
