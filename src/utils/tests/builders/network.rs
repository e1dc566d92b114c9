//! Builder for test `Network` instances.

use crate::models::{Network, RpcUrl};

pub struct NetworkBuilder {
	name: String,
	slug: String,
	chain_id: u64,
	rpc_urls: Vec<RpcUrl>,
	block_time_ms: u64,
	cron_schedule: String,
}

impl Default for NetworkBuilder {
	fn default() -> Self {
		Self {
			name: "Test Network".to_string(),
			slug: "test_network".to_string(),
			chain_id: 1,
			rpc_urls: vec![rpc("https://rpc.test.network", 100)],
			block_time_ms: 12_000,
			cron_schedule: "0 */1 * * * *".to_string(),
		}
	}
}

fn rpc(url: &str, weight: u32) -> RpcUrl {
	RpcUrl {
		type_: "rpc".to_string(),
		url: url.to_string(),
		weight,
	}
}

impl NetworkBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = name.to_string();
		self
	}

	pub fn slug(mut self, slug: &str) -> Self {
		self.slug = slug.to_string();
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Replaces all endpoints with a single one of weight 100
	pub fn rpc_url(mut self, url: &str) -> Self {
		self.rpc_urls = vec![rpc(url, 100)];
		self
	}

	/// Sets the weight of every configured endpoint
	pub fn rpc_weight(mut self, weight: u32) -> Self {
		for rpc_url in &mut self.rpc_urls {
			rpc_url.weight = weight;
		}
		self
	}

	pub fn add_rpc_url(mut self, url: &str, weight: u32) -> Self {
		self.rpc_urls.push(rpc(url, weight));
		self
	}

	pub fn clear_rpc_urls(mut self) -> Self {
		self.rpc_urls.clear();
		self
	}

	pub fn block_time_ms(mut self, block_time_ms: u64) -> Self {
		self.block_time_ms = block_time_ms;
		self
	}

	pub fn cron_schedule(mut self, schedule: &str) -> Self {
		self.cron_schedule = schedule.to_string();
		self
	}

	pub fn build(self) -> Network {
		Network {
			slug: self.slug,
			name: self.name,
			chain_id: self.chain_id,
			rpc_urls: self.rpc_urls,
			block_time_ms: self.block_time_ms,
			cron_schedule: self.cron_schedule,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_network() {
		let network = NetworkBuilder::new().build();

		assert_eq!(network.slug, "test_network");
		assert_eq!(network.chain_id, 1);
		assert_eq!(network.rpc_urls.len(), 1);
		assert_eq!(network.rpc_urls[0].type_, "rpc");
		assert_eq!(network.rpc_urls[0].weight, 100);
	}

	#[test]
	fn test_rpc_url_methods() {
		let network = NetworkBuilder::new()
			.clear_rpc_urls()
			.add_rpc_url("https://rpc1.example.com", 80)
			.add_rpc_url("https://rpc2.example.com", 20)
			.build();

		assert_eq!(network.rpc_urls.len(), 2);
		assert_eq!(network.rpc_urls[0].url, "https://rpc1.example.com");
		assert_eq!(network.rpc_urls[1].weight, 20);
	}
}
