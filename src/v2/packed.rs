//! Packed mode (spec §4.5): required fields in FID order, then — only when
//! at least one optional field is absent — a presence bitmap and the
//! present optionals' values, also in FID order. Drops field names
//! entirely from the wire; the schema the header names is what recovers
//! them.
//!
//! Wire grammar (spec §6): `TypeName@( v₁ v₂ … )` (dense) or
//! `TypeName@{bm=0b<bits>}( r₁ … rₖ o_{i₁} o_{i₂} … )` (bitmap).

use crate::emit::{self, EmitOptions};
use crate::error::{Diagnostic, GlyphError, GlyphErrorKind};
use crate::lexer::{Lexer, TokenKind, TokenStream};
use crate::parser::value_parser::parse_value;
use crate::schema::{FieldDef, Schema, StructDef};
use crate::value::Value;

fn presence_bitmap(value: &Value, optional_order: &[&FieldDef]) -> Vec<bool> {
	optional_order
		.iter()
		.map(|f| value.get(&f.name).map(|v| f.is_present(v)).unwrap_or(false))
		.collect()
}

fn bitmap_to_binary_string(bits: &[bool]) -> String {
	bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn binary_string_to_bitmap(bits_str: &str, len: usize) -> Result<Vec<bool>, GlyphError> {
	if !bits_str.chars().all(|c| c == '0' || c == '1') {
		return Err(GlyphError::new(GlyphErrorKind::BadBitmap, format!("malformed packed bitmap {bits_str:?}")));
	}
	let mut bits: Vec<bool> = bits_str.chars().map(|c| c == '1').collect();
	// A bitmap may be emitted with trailing zero-bits dropped; pad to `len`.
	while bits.len() < len {
		bits.push(false);
	}
	Ok(bits)
}

/// Encode `value` (a `Struct` of type `type_name`) as a packed-mode value:
/// `TypeName@(…)` or, when some optional field is absent, `TypeName@{bm=0b…}(…)`.
pub fn encode(value: &Value, type_name: &str, schema: &Schema) -> Result<String, GlyphError> {
	let def = schema
		.require(type_name)?
		.as_struct()
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::TypeMismatch, format!("{type_name:?} is not a struct type")))?;

	let order = def.packed_field_order();
	let optional_order = def.optional_fields_in_fid_order();
	let bitmap = presence_bitmap(value, &optional_order);
	let needs_bitmap = bitmap.iter().any(|present| !present);

	let mut out = String::new();
	out.push_str(type_name);
	out.push('@');
	if needs_bitmap {
		out.push_str("{bm=0b");
		out.push_str(&bitmap_to_binary_string(&bitmap));
		out.push('}');
	}
	out.push('(');
	let mut first = true;
	for field in &order {
		let field_value = value.get(&field.name).cloned().unwrap_or_else(Value::null);
		if field.optional && !field.is_present(&field_value) {
			continue;
		}
		if !first {
			out.push(' ');
		}
		first = false;
		out.push_str(&emit::emit(&field_value, Some(schema), &EmitOptions::canonical_hash_options())?);
	}
	out.push(')');
	Ok(out)
}

fn parse_positional_values(body: &str) -> Result<Vec<Value>, GlyphError> {
	let body = body
		.trim_start()
		.strip_prefix('(')
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnexpectedToken, "packed body must start with '('"))?;
	let tokens = Lexer::new(body).tokenize();
	let mut ts = TokenStream::new(&tokens);
	let mut diagnostics: Vec<Diagnostic> = Vec::new();
	let mut values = Vec::new();
	while !ts.is_eof() && ts.peek().kind != TokenKind::RParen {
		values.push(parse_value(&mut ts, &mut diagnostics));
	}
	if let Some(d) = diagnostics.into_iter().next() {
		return Err(d.into());
	}
	if ts.peek().kind != TokenKind::RParen {
		return Err(GlyphError::new(GlyphErrorKind::UnclosedContainer, "unclosed packed value list"));
	}
	Ok(values)
}

/// Decode a packed-mode body (the type name already stripped: `@(…)` or
/// `@{bm=0b…}(…)`) against `def` for `type_name`, reconstructing the full
/// `Struct` value.
///
/// Tolerates an early `)` on the dense form as long as every remaining
/// FID slot is optional (spec §4.5 "the packed parser mirrors the
/// emitter … tolerating early `)`").
pub fn decode(body: &str, type_name: &str, def: &StructDef) -> Result<Value, GlyphError> {
	let order = def.packed_field_order();
	let optional_order = def.optional_fields_in_fid_order();

	let body = body
		.trim_start()
		.strip_prefix('@')
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnexpectedToken, "packed value is missing its '@'"))?;

	let (bitmap, rest) = match body.strip_prefix("{bm=0b") {
		Some(after) => {
			let close = after
				.find('}')
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::BadBitmap, "packed bitmap is not terminated by '}'"))?;
			let bits = binary_string_to_bitmap(&after[..close], optional_order.len())?;
			(bits, &after[close + 1..])
		}
		None => (vec![false; optional_order.len()], body),
	};

	let values = parse_positional_values(rest)?;
	let mut values_iter = values.into_iter();
	let mut fields = Vec::with_capacity(order.len());

	let required_count = order.iter().filter(|f| !f.optional).count();
	let mut consumed_required = 0usize;
	for field in &order {
		if field.optional {
			continue;
		}
		match values_iter.next() {
			Some(v) => fields.push((field.name.clone(), v)),
			None => {
				return Err(GlyphError::new(GlyphErrorKind::MissingRequired, format!("missing required field {:?}", field.name)));
			}
		}
		consumed_required += 1;
	}
	if consumed_required != required_count {
		return Err(GlyphError::new(GlyphErrorKind::MissingRequired, "packed body has fewer values than required fields"));
	}

	for (i, field) in optional_order.iter().enumerate() {
		if bitmap.get(i).copied().unwrap_or(false) {
			let v = values_iter
				.next()
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::BadBitmap, "bitmap marks more optional fields present than values remain"))?;
			fields.push((field.name.clone(), v));
		} else if let Some(default) = &field.default {
			fields.push((field.name.clone(), default.clone()));
		} else {
			fields.push((field.name.clone(), Value::null()));
		}
	}

	Ok(Value::strct(type_name, fields))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldType, SchemaBuilder, TypeDef};

	fn team_schema() -> Schema {
		let mut builder = SchemaBuilder::new();
		builder.add_type(
			"Team",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("id", FieldType::Ref).with_fid(1),
				FieldDef::new("name", FieldType::Str).with_fid(2),
				FieldDef::new("league", FieldType::Str).with_fid(3),
			])),
		);
		builder.build().unwrap()
	}

	fn decode_roundtrip(encoded: &str, type_name: &str, def: &StructDef) -> Value {
		let stripped = encoded.strip_prefix(type_name).unwrap();
		decode(stripped, type_name, def).unwrap()
	}

	/// Scenario B (spec §8): an all-required `Team` encodes with no bitmap.
	#[test]
	fn scenario_b_packed_dense() {
		let schema = team_schema();
		let value = Value::strct(
			"Team",
			vec![
				("id".into(), Value::reference(Some("t".into()), "ARS")),
				("name".into(), Value::str("Arsenal")),
				("league".into(), Value::str("EPL")),
			],
		);
		let encoded = encode(&value, "Team", &schema).unwrap();
		assert_eq!(encoded, "Team@(^t:ARS Arsenal EPL)");

		let def = schema.get("Team").unwrap().as_struct().unwrap();
		let decoded = decode_roundtrip(&encoded, "Team", def);
		assert_eq!(decoded.get("name"), Some(&Value::str("Arsenal")));
	}

	/// Scenario C (spec §8): `Match` with some optionals present emits a
	/// `0010`-style bitmap over the optionals in FID order.
	#[test]
	fn scenario_c_packed_bitmap() {
		let mut builder = SchemaBuilder::new();
		builder.add_type(
			"Match",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("id", FieldType::Ref).with_fid(1),
				FieldDef::new("kickoff", FieldType::Time).with_fid(2),
				FieldDef::new("home", FieldType::Str).with_fid(3),
				FieldDef::new("away", FieldType::Str).with_fid(4),
				FieldDef::new("odds", FieldType::Float).optional().with_fid(5),
				FieldDef::new("pred", FieldType::Str).optional().with_fid(6),
				FieldDef::new("ft_h", FieldType::Int).optional().with_fid(7),
				FieldDef::new("ft_a", FieldType::Int).optional().with_fid(8),
			])),
		);
		let schema = builder.build().unwrap();

		let value = Value::strct(
			"Match",
			vec![
				("id".into(), Value::reference(Some("m".into()), "1")),
				("kickoff".into(), Value::time(chrono::DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z").unwrap().with_timezone(&chrono::Utc))),
				("home".into(), Value::str("ARS")),
				("away".into(), Value::str("LIV")),
				("ft_h".into(), Value::int(2)),
			],
		);
		let encoded = encode(&value, "Match", &schema).unwrap();
		assert!(encoded.starts_with("Match@{bm=0b0010}("), "got {encoded:?}");

		let def = schema.get("Match").unwrap().as_struct().unwrap();
		let decoded = decode_roundtrip(&encoded, "Match", def);
		assert_eq!(decoded.get("ft_h"), Some(&Value::int(2)));
		assert_eq!(decoded.get("odds"), Some(&Value::null()));
		assert_eq!(decoded.get("ft_a"), Some(&Value::null()));
	}

	/// An absent optional still needs a bitmap (spec §4.5: "selected when …
	/// at least one optional is absent"), even when it's the only optional
	/// field declared.
	#[test]
	fn absent_optional_still_needs_a_bitmap() {
		let mut builder = SchemaBuilder::new();
		builder.add_type(
			"Team",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("name", FieldType::Str),
				FieldDef::new("league", FieldType::Str).optional(),
			])),
		);
		let schema = builder.build().unwrap();
		let value = Value::strct("Team", vec![("name".into(), Value::str("Arsenal")), ("league".into(), Value::null())]);
		let encoded = encode(&value, "Team", &schema).unwrap();
		assert_eq!(encoded, "Team@{bm=0b0}(Arsenal)");

		let def = schema.get("Team").unwrap().as_struct().unwrap();
		let decoded = decode_roundtrip(&encoded, "Team", def);
		assert_eq!(decoded.get("name"), Some(&Value::str("Arsenal")));
		assert_eq!(decoded.get("league"), Some(&Value::null()));
	}
}
