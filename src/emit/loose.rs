//! Schema-optional canonicalization (SPEC_FULL.md §11), supplemented from
//! the upstream project's own `loose.rs` fragment
//! (`examples/other_examples/2cfb9bea_..._loose.rs.rs`). Reuses the
//! schema-aware emitter's scalar formatting (shortest round-trip floats,
//! `b64"…"` bytes, `^prefix:value` refs) so the two emitters never disagree
//! on how a scalar renders — only on key sorting and the auto-tabular
//! fast path.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::{format_float, format_int, quote_into};
use crate::value::{Value, ValueKind};

/// Options for loose canonicalization.
#[derive(Debug, Clone)]
pub struct LooseOptions {
	pub auto_tabular: bool,
	pub min_rows: usize,
	pub max_cols: usize,
}

impl Default for LooseOptions {
	fn default() -> Self {
		Self { auto_tabular: true, min_rows: 3, max_cols: 64 }
	}
}

/// Canonicalize `v` without consulting a schema.
pub fn canonicalize(v: &Value) -> String {
	canonicalize_with(v, &LooseOptions::default())
}

pub fn canonicalize_with(v: &Value, opts: &LooseOptions) -> String {
	let mut buf = String::new();
	write(&mut buf, v, opts);
	buf
}

/// SHA-256 of the loose canonical form, truncated to 8 bytes and hex
/// encoded. Distinct from [`super::canonical_hash`] (FNV-1a-64 over the
/// schema-aware canonical form) — the two serve different callers and are
/// not interchangeable (SPEC_FULL.md §11).
pub fn fingerprint(v: &Value) -> String {
	let canonical = canonicalize(v);
	let digest = Sha256::digest(canonical.as_bytes());
	hex::encode(&digest[..8])
}

pub fn equal(a: &Value, b: &Value) -> bool {
	canonicalize(a) == canonicalize(b)
}

fn write(buf: &mut String, v: &Value, opts: &LooseOptions) {
	match &v.kind {
		ValueKind::Null => buf.push('\u{2205}'),
		ValueKind::Bool(b) => buf.push(if *b { 't' } else { 'f' }),
		ValueKind::Int(n) => buf.push_str(&format_int(*n)),
		ValueKind::Float(f) => {
			let f = if *f == 0.0 { 0.0 } else { *f };
			buf.push_str(&format_float(f, true).expect("NaN/Inf allowed in loose mode"));
		}
		ValueKind::Str(s) => write_scalar_string(buf, s),
		ValueKind::Bytes(data) => {
			use base64::engine::general_purpose::STANDARD as BASE64;
			use base64::Engine as _;
			buf.push_str("b64\"");
			buf.push_str(&BASE64.encode(data));
			buf.push('"');
		}
		ValueKind::Time(t) => buf.push_str(&t.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
		ValueKind::Ref(r) => {
			buf.push('^');
			if let Some(prefix) = &r.prefix {
				buf.push_str(prefix);
				buf.push(':');
			}
			write_scalar_string(buf, &r.value);
		}
		ValueKind::List(items) => write_list(buf, items, opts),
		ValueKind::Map(entries) => {
			let pairs: Vec<(String, &Value)> = entries.iter().map(|(k, v)| (k.clone(), v)).collect();
			write_pairs(buf, &pairs, ':', opts);
		}
		ValueKind::Struct(s) => {
			buf.push_str(&s.type_name);
			let pairs: Vec<(String, &Value)> = s.fields.iter().map(|(k, v)| (k.clone(), v)).collect();
			write_pairs(buf, &pairs, '=', opts);
		}
		ValueKind::Sum(s) => {
			buf.push_str(&s.tag);
			buf.push('(');
			if let Some(inner) = s.value.as_deref() {
				write(buf, inner, opts);
			}
			buf.push(')');
		}
		ValueKind::Blob(b) => {
			buf.push_str("@blob cid=");
			buf.push_str(&b.cid.to_string());
		}
		ValueKind::PoolRef(p) => {
			buf.push_str("@pool ");
			write_scalar_string(buf, &p.0);
		}
	}
}

fn write_scalar_string(buf: &mut String, s: &str) {
	if super::is_bare_safe_string(s) {
		buf.push_str(s);
	} else {
		quote_into(buf, s);
	}
}

fn write_pairs(buf: &mut String, pairs: &[(String, &Value)], sep: char, opts: &LooseOptions) {
	let mut sorted: Vec<&(String, &Value)> = pairs.iter().collect();
	sorted.sort_by(|a, b| a.0.cmp(&b.0));
	buf.push('{');
	for (i, (k, v)) in sorted.into_iter().enumerate() {
		if i > 0 {
			buf.push(' ');
		}
		write_scalar_string(buf, k);
		buf.push(sep);
		write(buf, v, opts);
	}
	buf.push('}');
}

fn write_list(buf: &mut String, items: &[Value], opts: &LooseOptions) {
	if opts.auto_tabular {
		if let Some(tabular) = try_tabular(items, opts) {
			buf.push_str(&tabular);
			return;
		}
	}
	buf.push('[');
	for (i, item) in items.iter().enumerate() {
		if i > 0 {
			buf.push(' ');
		}
		write(buf, item, opts);
	}
	buf.push(']');
}

fn object_keys(v: &Value) -> Option<Vec<String>> {
	match &v.kind {
		ValueKind::Map(entries) => Some(entries.iter().map(|(k, _)| k.clone()).collect()),
		ValueKind::Struct(s) => Some(s.fields.iter().map(|(k, _)| k.clone()).collect()),
		_ => None,
	}
}

fn object_value<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
	v.get(key)
}

/// Homogeneous struct/map lists of at least `min_rows` rows and no more
/// than `max_cols` distinct keys auto-render as a `@tab` block.
fn try_tabular(items: &[Value], opts: &LooseOptions) -> Option<String> {
	if items.len() < opts.min_rows {
		return None;
	}
	let mut all_keys: HashSet<String> = HashSet::new();
	let mut row_keys: Vec<HashSet<String>> = Vec::new();
	for item in items {
		let keys = object_keys(item)?;
		let set: HashSet<String> = keys.into_iter().collect();
		all_keys.extend(set.iter().cloned());
		row_keys.push(set);
	}
	if all_keys.is_empty() || all_keys.len() > opts.max_cols {
		return None;
	}
	let mut common = row_keys[0].clone();
	for keys in &row_keys[1..] {
		common = common.intersection(keys).cloned().collect();
	}
	if common.len() * 2 < all_keys.len() {
		return None;
	}

	let mut cols: Vec<String> = all_keys.into_iter().collect();
	cols.sort();

	let mut out = String::new();
	out.push_str("@tab _ rows=");
	out.push_str(&items.len().to_string());
	out.push_str(" cols=");
	out.push_str(&cols.len().to_string());
	out.push_str(" [");
	for (i, c) in cols.iter().enumerate() {
		if i > 0 {
			out.push(' ');
		}
		write_scalar_string(&mut out, c);
	}
	out.push_str("]\n");
	for item in items {
		out.push('|');
		for col in &cols {
			let mut cell = String::new();
			match object_value(item, col) {
				Some(v) => write(&mut cell, v, opts),
				None => cell.push('\u{2205}'),
			}
			out.push_str(&cell.replace('|', "\\|"));
			out.push('|');
		}
		out.push('\n');
	}
	out.push_str("@end");
	Some(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn loose_canonical_is_sorted_and_reparseable_shape() {
		let v = Value::map(vec![("b".into(), Value::int(1)), ("a".into(), Value::int(2))]);
		assert_eq!(canonicalize(&v), "{a:2 b:1}");
	}

	#[test]
	fn fingerprint_is_sixteen_hex_chars() {
		assert_eq!(fingerprint(&Value::int(1)).len(), 16);
	}

	#[test]
	fn equal_values_share_fingerprint() {
		let a = Value::map(vec![("x".into(), Value::int(1))]);
		let b = Value::map(vec![("x".into(), Value::int(1))]);
		assert!(equal(&a, &b));
	}

	#[test]
	fn auto_tabular_kicks_in_for_homogeneous_rows() {
		let rows: Vec<Value> = (0..3)
			.map(|i| Value::map(vec![("n".into(), Value::int(i))]))
			.collect();
		let out = canonicalize(&Value::list(rows));
		assert!(out.starts_with("@tab"));
		assert!(out.ends_with("@end"));
	}
}
