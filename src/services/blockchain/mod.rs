//! Chain access over JSON-RPC.
//!
//! - `ChainClient`: the reads a monitoring round needs
//! - `EthClient`: `eth_blockNumber` / `eth_getLogs` implementation
//! - transports: HTTP with retries and endpoint failover

mod client;
mod clients;
mod error;
mod transports;

pub use client::ChainClient;
pub use clients::EthClient;
pub use error::BlockChainError;
pub use transports::{
	rpc_request, BlockchainTransport, EndpointManager, HttpTransportClient, RotatingTransport,
	TransientErrorRetryStrategy, TransportError, ROTATE_ON_ERROR_CODES,
};
