use std::collections::HashMap;

use sha2::{Digest, Sha256};

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// RFC 4648 base32, lowercase, no padding. No crate in the retrieval pack
/// carries a base32 dependency, so this is hand-rolled the same way the
/// teacher hand-rolls Rabin fingerprinting in `schema/safe/rabin.rs` for a
/// concern nothing else covers.
fn base32_lower(bytes: &[u8]) -> String {
	let mut out = String::with_capacity((bytes.len() * 8 + 4) / 5);
	let mut buf: u32 = 0;
	let mut bits = 0u32;
	for &b in bytes {
		buf = (buf << 8) | b as u32;
		bits += 8;
		while bits >= 5 {
			bits -= 5;
			let idx = (buf >> bits) & 0x1f;
			out.push(BASE32_ALPHABET[idx as usize] as char);
		}
	}
	if bits > 0 {
		let idx = (buf << (5 - bits)) & 0x1f;
		out.push(BASE32_ALPHABET[idx as usize] as char);
	}
	out
}

/// An immutable key dictionary: an ordered list of keys with bidirectional
/// `key ↔ index` lookups, used by the v2 layer to replace map/struct keys
/// with numeric indices (spec §3 "SchemaContext").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContext {
	id: String,
	keys: Vec<String>,
	index_of: HashMap<String, u32>,
}

impl SchemaContext {
	/// Build a context from an ordered key list. The id is derived from the
	/// null-separated key list, so two contexts built from the same keys in
	/// the same order always share an id.
	pub fn new(keys: Vec<String>) -> Self {
		let joined = keys.join("\0");
		let digest = Sha256::digest(joined.as_bytes());
		let id = base32_lower(&digest[..5]);
		let index_of = keys.iter().enumerate().map(|(i, k)| (k.clone(), i as u32)).collect();
		Self { id, keys, index_of }
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn keys(&self) -> &[String] {
		&self.keys
	}

	pub fn index_of(&self, key: &str) -> Option<u32> {
		self.index_of.get(key).copied()
	}

	pub fn key_at(&self, index: u32) -> Option<&str> {
		self.keys.get(index as usize).map(|s| s.as_str())
	}
}
