//! Errors raised while turning chain logs into jobs.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents errors that abort job derivation for a log
#[derive(ThisError, Debug)]
pub enum JobsMakerError {
	/// topic0 is not an event this node handles
	#[error("Unsupported topic: {0}")]
	UnsupportedTopic(ErrorContext),

	/// Topics or data do not match the event's ABI
	#[error("Decode error: {0}")]
	DecodeError(ErrorContext),

	/// A lookup of related entities failed (misses are not errors)
	#[error("Lookup error: {0}")]
	LookupError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl JobsMakerError {
	pub fn unsupported_topic(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::UnsupportedTopic(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn decode_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::DecodeError(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn lookup_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::LookupError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for JobsMakerError {
	fn trace_id(&self) -> String {
		match self {
			Self::UnsupportedTopic(ctx) | Self::DecodeError(ctx) | Self::LookupError(ctx) => {
				ctx.trace_id.clone()
			}
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
