//! Mock implementations for testing purposes.
//!
//! This module contains mock implementations of various traits used throughout
//! the application, primarily for testing. It includes mocks for:
//! - The chain client and JSON-RPC transports
//! - Repository interfaces
//! - The cron scheduler
//!
//! The mocks are implemented using the `mockall` crate.

#[allow(unused_imports)]
pub use clients::*;
#[allow(unused_imports)]
pub use repositories::*;
#[allow(unused_imports)]
pub use services::*;
#[allow(unused_imports)]
pub use transports::*;
