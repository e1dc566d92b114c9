//! Chain client implementations.

mod eth {
	pub mod client;
}

pub use eth::client::EthClient;
