//! Utility modules shared across the monitor.
//!
//! - cron_utils: cron schedule helpers
//! - http: retryable HTTP client construction
//! - logging: tracing setup and error context
//! - parsing: string and RPC quantity parsing
//! - tests: builders for test fixtures

mod cron_utils;

pub mod http;
pub mod logging;
pub mod parsing;

pub use cron_utils::*;
pub use http::*;
pub use parsing::*;
