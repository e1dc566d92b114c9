//! Job derivation from chain logs.
//!
//! Maps each marketplace or token log to the queue jobs the node's role reacts with.

mod error;
mod events;
mod service;

pub use error::JobsMakerError;
pub use events::{
	closing_type, decode, decode_channel_event, Approval, ChannelEvent, EventKind,
	LogChannelCloseRequested, LogChannelCreated, LogChannelToppedUp, LogCooperativeChannelClose,
	LogOfferingCreated, LogOfferingDeleted, LogOfferingPopedUp, LogUnCooperativeChannelClose,
	Transfer,
};
pub use service::JobsMaker;
