//! Core services implementing the business logic.
//!
//! This module contains the main service implementations:
//! - `blockchain`: Chain client interfaces and the JSON-RPC implementation
//! - `blockwatcher`: Monitoring rounds and their scheduling
//! - `jobsmaker`: Turning chain logs into queue jobs

pub mod blockchain;
pub mod blockwatcher;
pub mod jobsmaker;
