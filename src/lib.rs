//! Blockchain event monitor of a payment channel marketplace controller.
//!
//! Scans confirmed block windows for marketplace and token logs that concern the
//! node's accounts and turns them into jobs for the controller's job queue. It includes:
//!
//! - Configuration management through JSON files
//! - A JSON-RPC chain client with weighted endpoint failover
//! - Job derivation for the agent and client roles
//! - Atomic persistence of jobs and scan checkpoints in SQLite
//!
//! # Module Structure
//!
//! - `bootstrap`: Wires configuration, database and chain client into a monitor
//! - `models`: Data structures for configuration, chain logs and jobs
//! - `repositories`: SQLite persistence of settings, entities and jobs
//! - `services`: Chain access, job derivation and monitoring rounds
//! - `utils`: Common utilities and helper functions

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
