//! Canonical emitter (spec §4.3) and the canonical hash it feeds (glossary:
//! "Canonical form")

mod hash;
pub mod loose;
mod number;

pub use hash::{fnv1a64, format_hash};
pub use number::{format_float, format_int};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::GlyphError;
use crate::schema::{Schema, SchemaContext};
use crate::value::{StructValue, SumValue, Value, ValueKind};

const RESERVED_SCALAR_WORDS: &[&str] = &["null", "none", "nil", "true", "t", "false", "f"];

/// Options controlling canonical emission (spec §4.3, §4.4 key modes).
#[derive(Debug, Clone, Default)]
pub struct EmitOptions<'a> {
	/// Prefer each field's `wire_key` over its declared name, when a schema
	/// is supplied and the field declares one.
	pub use_wire_keys: bool,
	/// Sort map/struct fields lexicographically by key. The canonical hash
	/// always uses `true`; this flag exists for callers that want
	/// insertion-ordered debug output.
	pub sort_fields: bool,
	/// Reserved for a future pretty-printer; canonical output is always the
	/// single-space-separated compact form described in spec §4.3.
	pub compact: bool,
	/// Allow `NaN`/`Inf`/`-Inf` floats to be emitted as their named tokens.
	pub allow_non_finite: bool,
	/// When set, any map/struct key present in the context is replaced by
	/// `#<index>` (spec §4.3 "in schema-context mode").
	pub schema_context: Option<&'a SchemaContext>,
}

impl<'a> EmitOptions<'a> {
	/// The options the canonical hash (spec §4.3) is always computed with.
	pub fn canonical_hash_options() -> Self {
		Self { use_wire_keys: false, sort_fields: true, compact: true, allow_non_finite: false, schema_context: None }
	}
}

/// Emit `value` as canonical GLYPH-T text.
pub fn emit(value: &Value, schema: Option<&Schema>, options: &EmitOptions<'_>) -> Result<String, GlyphError> {
	let mut buf = String::new();
	write_value(&mut buf, value, schema, options)?;
	Ok(buf)
}

/// The canonical hash (spec §4.3, glossary "FNV-1a-64"): emit with
/// `{use_wire_keys=false, compact=true, sort_fields=true}`, then FNV-1a-64
/// the bytes, formatted as 16 lowercase hex digits.
pub fn canonical_hash(value: &Value, schema: Option<&Schema>) -> Result<String, GlyphError> {
	let text = emit(value, schema, &EmitOptions::canonical_hash_options())?;
	Ok(format_hash(fnv1a64(text.as_bytes())))
}

fn write_value(buf: &mut String, value: &Value, schema: Option<&Schema>, opts: &EmitOptions<'_>) -> Result<(), GlyphError> {
	match &value.kind {
		ValueKind::Null => buf.push('\u{2205}'),
		ValueKind::Bool(b) => buf.push(if *b { 't' } else { 'f' }),
		ValueKind::Int(n) => buf.push_str(&format_int(*n)),
		ValueKind::Float(f) => buf.push_str(&format_float(*f, opts.allow_non_finite)?),
		ValueKind::Str(s) => write_string(buf, s),
		ValueKind::Bytes(b) => {
			buf.push_str("b64\"");
			buf.push_str(&BASE64.encode(b));
			buf.push('"');
		}
		ValueKind::Time(t) => {
			buf.push_str(&t.format("%Y-%m-%dT%H:%M:%SZ").to_string());
		}
		ValueKind::Ref(r) => {
			buf.push('^');
			if let Some(prefix) = &r.prefix {
				buf.push_str(prefix);
				buf.push(':');
			}
			buf.push_str(&r.value);
		}
		ValueKind::List(items) => {
			buf.push('[');
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					buf.push(' ');
				}
				write_value(buf, item, schema, opts)?;
			}
			buf.push(']');
		}
		ValueKind::Map(entries) => write_map(buf, entries, schema, opts)?,
		ValueKind::Struct(s) => write_struct(buf, s, schema, opts)?,
		ValueKind::Sum(s) => write_sum(buf, s, schema, opts)?,
		ValueKind::Blob(b) => {
			buf.push_str("@blob cid=");
			buf.push_str(&b.cid.to_string());
			buf.push_str(" mime=");
			buf.push_str(&b.mime);
			buf.push_str(" bytes=");
			buf.push_str(&b.bytes.len().to_string());
			if let Some(name) = &b.name {
				buf.push_str(" name=");
				write_string(buf, name);
			}
			if let Some(caption) = &b.caption {
				buf.push_str(" caption=");
				write_string(buf, caption);
			}
			if let Some(preview) = &b.preview {
				buf.push_str(" preview=");
				write_string(buf, preview);
			}
		}
		ValueKind::PoolRef(p) => {
			buf.push_str("@pool ");
			write_string(buf, &p.0);
		}
	}
	Ok(())
}

fn emit_key(buf: &mut String, key: &str, opts: &EmitOptions<'_>) {
	if let Some(ctx) = opts.schema_context {
		if let Some(idx) = ctx.index_of(key) {
			buf.push('#');
			buf.push_str(&idx.to_string());
			return;
		}
	}
	write_string(buf, key);
}

fn write_map(buf: &mut String, entries: &[(String, Value)], schema: Option<&Schema>, opts: &EmitOptions<'_>) -> Result<(), GlyphError> {
	let mut ordered: Vec<&(String, Value)> = entries.iter().collect();
	if opts.sort_fields {
		ordered.sort_by(|a, b| a.0.cmp(&b.0));
	}
	buf.push('{');
	for (i, (k, v)) in ordered.into_iter().enumerate() {
		if i > 0 {
			buf.push(' ');
		}
		emit_key(buf, k, opts);
		buf.push(':');
		write_value(buf, v, schema, opts)?;
	}
	buf.push('}');
	Ok(())
}

fn write_struct(buf: &mut String, s: &StructValue, schema: Option<&Schema>, opts: &EmitOptions<'_>) -> Result<(), GlyphError> {
	let field_def = schema
		.and_then(|s2| s2.get(&s.type_name))
		.and_then(|td| td.as_struct());

	buf.push_str(&s.type_name);
	buf.push('{');

	let mut ordered: Vec<&(String, Value)> = s.fields.iter().collect();
	if opts.sort_fields {
		ordered.sort_by(|a, b| a.0.cmp(&b.0));
	}
	for (i, (k, v)) in ordered.into_iter().enumerate() {
		if i > 0 {
			buf.push(' ');
		}
		let key_to_emit: &str = if opts.use_wire_keys {
			field_def
				.and_then(|def| def.field_by_key(k))
				.and_then(|f| f.wire_key.as_deref())
				.unwrap_or(k)
		} else {
			k
		};
		emit_key(buf, key_to_emit, opts);
		buf.push('=');
		write_value(buf, v, schema, opts)?;
	}
	buf.push('}');
	Ok(())
}

fn write_sum(buf: &mut String, s: &SumValue, schema: Option<&Schema>, opts: &EmitOptions<'_>) -> Result<(), GlyphError> {
	buf.push_str(&s.tag);
	match s.value.as_deref() {
		None => buf.push_str("()"),
		Some(v) => match &v.kind {
			ValueKind::Struct(inner) => {
				buf.push('{');
				let mut ordered: Vec<&(String, Value)> = inner.fields.iter().collect();
				if opts.sort_fields {
					ordered.sort_by(|a, b| a.0.cmp(&b.0));
				}
				for (i, (k, fv)) in ordered.into_iter().enumerate() {
					if i > 0 {
						buf.push(' ');
					}
					emit_key(buf, k, opts);
					buf.push('=');
					write_value(buf, fv, schema, opts)?;
				}
				buf.push('}');
			}
			ValueKind::Map(entries) => {
				buf.push('{');
				let mut ordered: Vec<&(String, Value)> = entries.iter().collect();
				if opts.sort_fields {
					ordered.sort_by(|a, b| a.0.cmp(&b.0));
				}
				for (i, (k, fv)) in ordered.into_iter().enumerate() {
					if i > 0 {
						buf.push(' ');
					}
					emit_key(buf, k, opts);
					buf.push(':');
					write_value(buf, fv, schema, opts)?;
				}
				buf.push('}');
			}
			_ => {
				buf.push('(');
				write_value(buf, v, schema, opts)?;
				buf.push(')');
			}
		},
	}
	Ok(())
}

/// Is `s` safe to emit unquoted as a plain (non-ref) string?
///
/// This is the *string* predicate, not the identifier grammar: it mirrors
/// the upstream project's `is_bare_safe` (`loose.rs`), which permits
/// `_ - . / @ :` and unicode so values like `"m:ARS-LIV"` stay bare rather
/// than round-tripping through quotes.
pub fn is_bare_safe_string(s: &str) -> bool {
	let mut chars = s.chars();
	let first = match chars.next() {
		Some(c) => c,
		None => return false,
	};
	if first.is_ascii_digit() || first == '"' || first == '\'' || first == '-' {
		return false;
	}
	if RESERVED_SCALAR_WORDS.contains(&s) {
		return false;
	}
	s.chars().all(|c| {
		c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '/' || c == '@' || c == ':' || (c as u32) > 127
	})
}

fn write_string(buf: &mut String, s: &str) {
	if is_bare_safe_string(s) {
		buf.push_str(s);
	} else {
		quote_into(buf, s);
	}
}

pub(crate) fn quote_into(buf: &mut String, s: &str) {
	buf.push('"');
	for c in s.chars() {
		match c {
			'\\' => buf.push_str("\\\\"),
			'"' => buf.push_str("\\\""),
			'\n' => buf.push_str("\\n"),
			'\r' => buf.push_str("\\r"),
			'\t' => buf.push_str("\\t"),
			c => buf.push(c),
		}
	}
	buf.push('"');
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scenario_a_canonical_struct() {
		let home = Value::map(vec![
			("t".into(), Value::str("ARS")),
			("n".into(), Value::str("Arsenal")),
		]);
		let v = Value::map(vec![
			("id".into(), Value::str("m:ARS-LIV")),
			("home".into(), home),
			("xH".into(), Value::float(1.72)),
		]);
		let opts = EmitOptions { sort_fields: true, compact: true, ..Default::default() };
		let text = emit(&v, None, &opts).unwrap();
		assert_eq!(text, "{home:{n:Arsenal t:ARS} id:m:ARS-LIV xH:1.72}");
	}

	#[test]
	fn bare_vs_quoted_strings() {
		assert!(is_bare_safe_string("Arsenal"));
		assert!(is_bare_safe_string("m:ARS-LIV"));
		assert!(!is_bare_safe_string("true"));
		assert!(!is_bare_safe_string("has space"));
		assert!(!is_bare_safe_string("-leading-dash"));
	}

	#[test]
	fn bytes_are_base64_wrapped() {
		let v = Value::bytes(vec![1, 2, 3]);
		let text = emit(&v, None, &EmitOptions::canonical_hash_options()).unwrap();
		assert!(text.starts_with("b64\""));
	}

	#[test]
	fn canonical_hash_is_sixteen_hex_chars() {
		let v = Value::int(42);
		let h = canonical_hash(&v, None).unwrap();
		assert_eq!(h.len(), 16);
	}
}
