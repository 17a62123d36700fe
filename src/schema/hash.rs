use std::collections::BTreeMap;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use super::{FieldType, TypeDef, TypeDefKind};

/// Renders the schema's canonical text: type names sorted lexicographically,
/// each type's fields rendered in a fixed, declaration-independent order
/// (spec §3 invariant 3).
///
/// Hashing this text (not the `TypeDef` structs themselves) is what makes
/// `Schema::hash` stable across equivalent re-declarations, and sensitive
/// to any FID change (testable property 3 of spec §8).
pub fn canonical_schema_text(types: &BTreeMap<String, TypeDef>) -> String {
	let mut out = String::new();
	for (name, def) in types {
		write_type(&mut out, name, def);
	}
	out
}

fn write_type(out: &mut String, name: &str, def: &TypeDef) {
	let _ = write!(out, "{name}#v{}", def.version);
	match &def.kind {
		TypeDefKind::Struct(s) => {
			out.push_str("{struct:");
			let mut fields: Vec<_> = s.fields.iter().collect();
			fields.sort_by(|a, b| a.name.cmp(&b.name));
			for f in fields {
				let _ = write!(
					out,
					"[{}:{}:{}:{}:{}]",
					f.name,
					render_ty(&f.ty),
					f.fid,
					f.optional,
					f.wire_key.as_deref().unwrap_or("")
				);
			}
			out.push('}');
		}
		TypeDefKind::Sum(s) => {
			out.push_str("{sum:");
			let mut variants: Vec<_> = s.variants.iter().collect();
			variants.sort_by(|a, b| a.tag.cmp(&b.tag));
			for v in variants {
				let _ = write!(out, "[{}:{}]", v.tag, v.ty.as_ref().map(render_ty).unwrap_or_default());
			}
			out.push('}');
		}
	}
	out.push(';');
}

fn render_ty(ty: &FieldType) -> String {
	match ty {
		FieldType::Null => "null".into(),
		FieldType::Bool => "bool".into(),
		FieldType::Int => "int".into(),
		FieldType::Float => "float".into(),
		FieldType::Str => "str".into(),
		FieldType::Bytes => "bytes".into(),
		FieldType::Time => "time".into(),
		FieldType::Ref => "ref".into(),
		FieldType::Any => "any".into(),
		FieldType::List(inner) => format!("list<{}>", render_ty(inner)),
		FieldType::Map(inner) => format!("map<{}>", render_ty(inner)),
		FieldType::Struct(n) => format!("struct<{n}>"),
		FieldType::Sum(n) => format!("sum<{n}>"),
	}
}

/// SHA-256 of the canonical schema text, truncated to its first 16 bytes
/// and hex-encoded (spec §3 invariant 3).
pub fn schema_hash(types: &BTreeMap<String, TypeDef>) -> String {
	let text = canonical_schema_text(types);
	let digest = Sha256::digest(text.as_bytes());
	hex::encode(&digest[..16])
}
