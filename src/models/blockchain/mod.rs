//! Chain data consumed by the monitor.

mod filter;
mod log;

pub use filter::FilterQuery;
pub use log::{ChainLogEvent, RpcLog};
