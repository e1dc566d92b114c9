//! Persistence backed by the controller's SQLite database.
//!
//! - `Database`: connection pool and embedded migrations
//! - `SettingsRepository`: configured scan parameters and scan checkpoints
//! - `EntityRepository`: account, offering, channel and queued-job lookups
//! - `JobRepository`: job queue inserts and the atomic round commit

mod database;
mod entity;
mod error;
mod job;
mod settings;

pub use database::Database;
pub use entity::{ChannelKey, EntityRepository, EntityRepositoryTrait};
pub use error::RepositoryError;
pub use job::{JobRepository, RoundStore};
pub use settings::{
	SettingsRepository, SettingsRepositoryTrait, BLOCK_LIMIT_KEY, FRESH_OFFERINGS_KEY,
	MIN_CONFIRMATIONS_KEY,
};
