//! Tabular mode (spec §4.6): a homogeneous list of structs rendered as a
//! column header plus one row of space-separated values per element — the
//! common "list of records" shape where packed mode would otherwise repeat
//! the same bitmap pattern on every row.
//!
//! Wire grammar (spec §6): `@tab TypeName [col1 col2 …]\n<row>\n…\n@end`,
//! where each `<row>` is the packed value grammar's column values in FID
//! order, space-separated — no pipes, no per-cell escaping. A row may
//! instead open with a `{bm=0b<bits>}` presence bitmap over just the
//! optional columns, the same compaction packed mode uses, for tables
//! where most rows leave most optionals absent.

use crate::emit::{self, EmitOptions};
use crate::error::{GlyphError, GlyphErrorKind};
use crate::lexer::{Lexer, TokenKind, TokenStream};
use crate::parser::directives::KeyMode;
use crate::parser::value_parser::parse_value;
use crate::schema::{FieldDef, Schema, StructDef};
use crate::value::Value;

/// The column label to print in a `@tab` header for one field, per the
/// document's key mode (spec §4.6: the header "may use wire keys or FIDs
/// based on `key_mode`").
fn column_label(field: &FieldDef, key_mode: KeyMode) -> String {
	match key_mode {
		KeyMode::Name => field.name.clone(),
		KeyMode::Wire => field.wire_key.clone().unwrap_or_else(|| field.name.clone()),
		KeyMode::Fid => field.fid.to_string(),
	}
}

fn bitmap_to_binary_string(bits: &[bool]) -> String {
	bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn binary_string_to_bitmap(bits_str: &str, len: usize) -> Result<Vec<bool>, GlyphError> {
	if !bits_str.chars().all(|c| c == '0' || c == '1') {
		return Err(GlyphError::new(GlyphErrorKind::BadBitmap, format!("malformed tabular row bitmap {bits_str:?}")));
	}
	let mut bits: Vec<bool> = bits_str.chars().map(|c| c == '1').collect();
	while bits.len() < len {
		bits.push(false);
	}
	Ok(bits)
}

/// Encode a list of same-typed struct `Value`s as a tabular-mode body,
/// including the leading `@tab TypeName […]` header. `key_mode` selects
/// whether the header names columns by field name, wire key, or FID (spec
/// §4.6).
pub fn encode(items: &[Value], type_name: &str, schema: &Schema, key_mode: KeyMode) -> Result<String, GlyphError> {
	let def = schema
		.require(type_name)?
		.as_struct()
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::TypeMismatch, format!("{type_name:?} is not a struct type")))?;
	let columns = def.packed_field_order();
	let optional_order = def.optional_fields_in_fid_order();

	let mut out = String::new();
	out.push_str("@tab ");
	out.push_str(type_name);
	out.push_str(" [");
	for (i, field) in columns.iter().enumerate() {
		if i > 0 {
			out.push(' ');
		}
		out.push_str(&column_label(field, key_mode));
	}
	out.push_str("]\n");

	for item in items {
		out.push_str(&encode_row(item, &columns, &optional_order, schema)?);
		out.push('\n');
	}
	out.push_str("@end");
	Ok(out)
}

fn encode_row(item: &Value, columns: &[&FieldDef], optional_order: &[&FieldDef], schema: &Schema) -> Result<String, GlyphError> {
	let bitmap: Vec<bool> = optional_order
		.iter()
		.map(|f| item.get(&f.name).map(|v| f.is_present(v)).unwrap_or(false))
		.collect();
	let needs_bitmap = bitmap.iter().any(|present| !present);

	let mut out = String::new();
	if needs_bitmap {
		out.push_str("{bm=0b");
		out.push_str(&bitmap_to_binary_string(&bitmap));
		out.push_str("} ");
	}
	let mut first = true;
	for field in columns {
		if needs_bitmap && field.optional {
			let present = item.get(&field.name).map(|v| field.is_present(v)).unwrap_or(false);
			if !present {
				continue;
			}
		}
		let field_value = item.get(&field.name).cloned().unwrap_or_else(Value::null);
		if !first {
			out.push(' ');
		}
		first = false;
		out.push_str(&emit::emit(&field_value, Some(schema), &EmitOptions::canonical_hash_options())?);
	}
	Ok(out)
}

fn parse_row_values(rest: &str) -> Result<Vec<Value>, GlyphError> {
	let tokens = Lexer::new(rest).tokenize();
	let mut ts = TokenStream::new(&tokens);
	let mut diagnostics = Vec::new();
	let mut values = Vec::new();
	while !ts.is_eof() && ts.peek().kind != TokenKind::Eof {
		values.push(parse_value(&mut ts, &mut diagnostics));
	}
	if let Some(d) = diagnostics.into_iter().next() {
		return Err(d.into());
	}
	Ok(values)
}

fn decode_row(line: &str, type_name: &str, columns: &[&FieldDef], optional_order: &[&FieldDef]) -> Result<Value, GlyphError> {
	let line = line.trim();
	let (bitmap, rest) = match line.strip_prefix("{bm=0b") {
		Some(after) => {
			let close = after
				.find('}')
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::BadBitmap, "tabular row bitmap is not terminated by '}'"))?;
			let bits = binary_string_to_bitmap(&after[..close], optional_order.len())?;
			(Some(bits), after[close + 1..].trim_start())
		}
		None => (None, line),
	};

	let mut values = parse_row_values(rest)?.into_iter();
	let mut fields = Vec::with_capacity(columns.len());

	match bitmap {
		None => {
			for field in columns {
				let v = values
					.next()
					.ok_or_else(|| GlyphError::new(GlyphErrorKind::MissingRequired, format!("tabular row is missing a value for {:?}", field.name)))?;
				fields.push((field.name.clone(), v));
			}
		}
		Some(bitmap) => {
			for field in columns {
				if field.optional {
					continue;
				}
				let v = values
					.next()
					.ok_or_else(|| GlyphError::new(GlyphErrorKind::MissingRequired, format!("tabular row is missing a value for {:?}", field.name)))?;
				fields.push((field.name.clone(), v));
			}
			for (i, field) in optional_order.iter().enumerate() {
				if bitmap.get(i).copied().unwrap_or(false) {
					let v = values.next().ok_or_else(|| {
						GlyphError::new(GlyphErrorKind::BadBitmap, "tabular row bitmap marks more optionals present than values remain")
					})?;
					fields.push((field.name.clone(), v));
				} else if let Some(default) = &field.default {
					fields.push((field.name.clone(), default.clone()));
				} else {
					fields.push((field.name.clone(), Value::null()));
				}
			}
		}
	}

	if values.next().is_some() {
		return Err(GlyphError::new(GlyphErrorKind::UnexpectedToken, "tabular row has more values than the table declares columns for"));
	}

	Ok(Value::strct(type_name, fields))
}

/// Decode a tabular-mode body (the type name already stripped:
/// ` [col1 col2 …]\n<row>\n…\n@end`).
pub fn decode(body: &str, type_name: &str, def: &StructDef) -> Result<Vec<Value>, GlyphError> {
	let body = body.trim_start();
	let cols_end = body.find(']').ok_or_else(|| GlyphError::new(GlyphErrorKind::UnexpectedToken, "tabular header's column list is unterminated"))?;
	let header_line = &body[..cols_end + 1];
	let cols_start = header_line.find('[').ok_or_else(|| GlyphError::new(GlyphErrorKind::UnexpectedToken, "tabular header is missing a column list"))?;
	let declared_columns: Vec<&str> = header_line[cols_start + 1..header_line.len() - 1].split_whitespace().collect();

	let columns: Vec<&FieldDef> = declared_columns
		.iter()
		.map(|name| {
			def.field_by_key(name)
				.or_else(|| name.parse::<u32>().ok().and_then(|fid| def.field_by_fid(fid)))
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnknownField, format!("unknown field {name:?}")))
		})
		.collect::<Result<_, _>>()?;
	let optional_order: Vec<&FieldDef> = columns.iter().filter(|f| f.optional).copied().collect();

	let mut rows = Vec::new();
	for line in body[cols_end + 1..].lines() {
		let line = line.trim();
		if line.is_empty() || line == "@end" {
			continue;
		}
		rows.push(decode_row(line, type_name, &columns, &optional_order)?);
	}
	Ok(rows)
}
