//! Error types for persistence operations.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents errors that can occur while reading or writing the controller database
#[derive(ThisError, Debug)]
pub enum RepositoryError {
	/// A row that must exist (e.g. a configured setting) is missing
	#[error("Not found: {0}")]
	NotFound(ErrorContext),

	/// A stored value could not be interpreted
	#[error("Parse error: {0}")]
	ParseError(ErrorContext),

	/// The database rejected or failed a statement
	#[error("Database error: {0}")]
	DatabaseError(ErrorContext),

	#[error("Internal error: {0}")]
	InternalError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl RepositoryError {
	pub fn not_found(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::NotFound(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn parse_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ParseError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn database_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::DatabaseError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn internal_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InternalError(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// Wraps a sqlx failure, tagging it with the operation that issued it.
	pub(crate) fn from_sqlx(operation: &str, err: sqlx::Error) -> Self {
		Self::database_error(
			format!("{} failed: {}", operation, err),
			Some(Box::new(err)),
			Some(HashMap::from([(
				"operation".to_string(),
				operation.to_string(),
			)])),
		)
	}
}

impl TraceableError for RepositoryError {
	fn trace_id(&self) -> String {
		match self {
			Self::NotFound(ctx)
			| Self::ParseError(ctx)
			| Self::DatabaseError(ctx)
			| Self::InternalError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
