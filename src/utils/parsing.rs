//! Parsing helpers for CLI arguments, configuration and RPC responses.

use anyhow::Context;
use byte_unit::Byte;
use std::str::FromStr;

/// Parses a human readable size such as "500MB" or "1GiB" into bytes.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	Byte::from_str(s)
		.map(|byte| byte.as_u64())
		.map_err(|e| format!("Invalid size format: '{}'. Error: {}", s, e))
}

/// Trims and lowercases a string for case-insensitive comparison.
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}

/// Parses a JSON-RPC quantity ("0x" prefixed hex, no leading zeros required).
pub fn parse_hex_quantity(quantity: &str) -> Result<u64, anyhow::Error> {
	let digits = quantity
		.strip_prefix("0x")
		.ok_or_else(|| anyhow::anyhow!("quantity without 0x prefix: {}", quantity))?;
	u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity: {}", quantity))
}
