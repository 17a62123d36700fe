//! Content-addressed blob storage (spec §3 "BlobRegistry", §6 "Blob reference format")

use std::collections::HashMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::error::{GlyphError, GlyphErrorKind};
use crate::value::Cid;

#[derive(Debug, Clone)]
pub struct BlobMeta {
	pub cid: Cid,
	pub mime: String,
	pub bytes: usize,
}

struct Entry {
	mime: String,
	content: Vec<u8>,
}

/// Thread-safe in-memory content-addressed store.
///
/// Reads are concurrent, writes exclusive (spec §5), via a single
/// reader/writer lock — the same shape as the teacher's object container
/// file reader/writer split, generalized from "one writer produces a file,
/// many readers replay it" to "one writer puts a blob, many readers get it".
pub struct BlobRegistry {
	inner: RwLock<HashMap<String, Entry>>,
}

impl BlobRegistry {
	pub fn new() -> Self {
		Self { inner: RwLock::new(HashMap::new()) }
	}

	/// Stores `content`, returning its content identifier `sha256:<hex>`.
	pub fn put(&self, content: Vec<u8>, mime: impl Into<String>) -> Cid {
		let digest = Sha256::digest(&content);
		let cid = Cid { algo: "sha256".to_string(), hex: hex::encode(digest) };
		let mut guard = self.inner.write().unwrap();
		guard.insert(cid.hex.clone(), Entry { mime: mime.into(), content });
		cid
	}

	pub fn has(&self, cid: &Cid) -> bool {
		if cid.algo != "sha256" {
			return false;
		}
		self.inner.read().unwrap().contains_key(&cid.hex)
	}

	pub fn get(&self, cid: &Cid) -> Result<Vec<u8>, GlyphError> {
		if cid.algo != "sha256" {
			return Err(GlyphError::new(
				GlyphErrorKind::UnsupportedHashAlgorithm,
				format!("unsupported hash algorithm {:?}", cid.algo),
			));
		}
		self.inner
			.read()
			.unwrap()
			.get(&cid.hex)
			.map(|e| e.content.clone())
			.ok_or_else(|| GlyphError::new(GlyphErrorKind::BlobNotFound, format!("blob not found: {cid}")))
	}

	pub fn meta(&self, cid: &Cid) -> Result<BlobMeta, GlyphError> {
		if cid.algo != "sha256" {
			return Err(GlyphError::new(
				GlyphErrorKind::UnsupportedHashAlgorithm,
				format!("unsupported hash algorithm {:?}", cid.algo),
			));
		}
		self.inner
			.read()
			.unwrap()
			.get(&cid.hex)
			.map(|e| BlobMeta { cid: cid.clone(), mime: e.mime.clone(), bytes: e.content.len() })
			.ok_or_else(|| GlyphError::new(GlyphErrorKind::BlobNotFound, format!("blob not found: {cid}")))
	}
}

impl Default for BlobRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn put_then_get_round_trips() {
		let reg = BlobRegistry::new();
		let cid = reg.put(b"hello".to_vec(), "text/plain");
		assert!(cid.to_string().starts_with("sha256:"));
		assert!(reg.has(&cid));
		assert_eq!(reg.get(&cid).unwrap(), b"hello");
		assert_eq!(reg.meta(&cid).unwrap().bytes, 5);
	}

	#[test]
	fn missing_blob_is_an_error() {
		let reg = BlobRegistry::new();
		let cid = Cid { algo: "sha256".into(), hex: "00".repeat(32) };
		assert!(matches!(reg.get(&cid).unwrap_err().kind(), GlyphErrorKind::BlobNotFound));
	}
}
