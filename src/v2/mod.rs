//! The v2 encoding layer (spec §4.4 "v2 header & mode detection", §4.5
//! "Packed mode", §4.6 "Tabular mode"): a thin header in front of one of
//! three bodies — the ordinary struct/map grammar the top-level emitter and
//! parser already speak, or one of the two schema-driven compact bodies in
//! this module.

pub mod packed;
pub mod tabular;

use crate::error::{GlyphError, GlyphErrorKind};
use crate::parser::directives::{self, Mode};
use crate::schema::{Schema, StructDef, TypeDef};
use crate::value::Value;

/// Default list-length threshold for auto-selecting tabular mode (spec
/// §4.4 "Auto-selection", `tab_threshold`).
pub const DEFAULT_TAB_THRESHOLD: usize = 3;

/// Detect the mode a document's header selects from its raw text (spec
/// §4.4 `detect_mode`): a `@patch`/`@tab` prefix picks its mode directly;
/// otherwise the presence of `@(` or `@{bm=` anywhere in the body means
/// packed; anything else defaults to struct mode.
pub fn detect_mode(src: &str) -> Mode {
	let trimmed = src.trim_start();
	if trimmed.starts_with("@patch") {
		return Mode::Patch;
	}
	if trimmed.starts_with("@tab") {
		return Mode::Tabular;
	}
	let (header, body) = directives::parse_header(src);
	if let Some(mode) = header.mode {
		if mode != Mode::Auto {
			return mode;
		}
	}
	if body.contains("@(") || body.contains("@{bm=") {
		Mode::Packed
	} else {
		Mode::Struct
	}
}

/// Choose a mode for `value` the way a producer would before encoding it
/// (spec §4.4 "Auto-selection", `select_mode`):
/// 1. a list of at least `tab_threshold` structs of one common, tabular-
///    enabled type becomes tabular;
/// 2. a single struct whose type allows packing becomes packed;
/// 3. anything else falls back to plain struct mode.
pub fn select_mode(value: &Value, schema: &Schema, tab_threshold: usize) -> Mode {
	use crate::value::ValueKind;
	if let ValueKind::List(items) = &value.kind {
		if items.len() >= tab_threshold {
			let common_type = items.iter().find_map(|v| match &v.kind {
				ValueKind::Struct(s) => Some(s.type_name.clone()),
				_ => None,
			});
			if let Some(type_name) = common_type {
				let all_match = items.iter().all(|v| matches!(&v.kind, ValueKind::Struct(s) if s.type_name == type_name));
				let tab_enabled = schema.get(&type_name).map(|td| td.tab_enabled).unwrap_or(false);
				if all_match && tab_enabled {
					return Mode::Tabular;
				}
			}
		}
	}
	if let ValueKind::Struct(s) = &value.kind {
		if schema.get(&s.type_name).map(|td| td.pack_enabled).unwrap_or(false) {
			return Mode::Packed;
		}
	}
	Mode::Struct
}

/// Splits a leading bare identifier (a struct/packed/tabular type name)
/// off the front of `body`.
fn leading_type_name(body: &str) -> Option<(&str, &str)> {
	let len = body.find(|c: char| !c.is_ascii_alphanumeric() && c != '_').unwrap_or(body.len());
	if len == 0 {
		None
	} else {
		Some(body.split_at(len))
	}
}

/// Decode any v2 document — struct, packed, or tabular — given the schema
/// that defines its type. Struct-mode bodies are handed to the ordinary
/// tolerant parser; packed and tabular bodies go through their dedicated
/// codecs. The type name is read off the front of the body itself
/// (`TypeName@(…)` / `@tab TypeName […]`), matching the value grammar in
/// spec §6 rather than carrying a redundant copy in the header.
pub fn decode(src: &str, schema: &Schema) -> Result<Value, GlyphError> {
	let (header, body) = directives::parse_header(src);
	let body = body.trim_start();

	match header.mode.unwrap_or(Mode::Struct) {
		Mode::Struct | Mode::Auto => {
			let (_, value) = crate::parser::parse_strict(src)?;
			Ok(value)
		}
		Mode::Packed => {
			let (type_name, rest) = leading_type_name(body)
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnknownType, "packed document is missing its leading type name"))?;
			let def = require_struct(schema, type_name)?;
			packed::decode(rest, type_name, def)
		}
		Mode::Tabular => {
			let (type_name, rest) = leading_type_name(body)
				.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnknownType, "tabular document is missing its leading type name"))?;
			let def = require_struct(schema, type_name)?;
			let rows = tabular::decode(rest, type_name, def)?;
			Ok(Value::list(rows))
		}
		Mode::Patch => Err(GlyphError::new(GlyphErrorKind::UnexpectedToken, "patch-mode documents must go through crate::patch")),
	}
}

fn require_struct<'a>(schema: &'a Schema, type_name: &str) -> Result<&'a StructDef, GlyphError> {
	schema
		.require(type_name)?
		.as_struct()
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::TypeMismatch, format!("{type_name:?} is not a struct type")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldDef, FieldType, SchemaBuilder};

	#[test]
	fn default_mode_is_struct() {
		assert_eq!(detect_mode("{x:1}"), Mode::Struct);
	}

	#[test]
	fn packed_directive_is_detected() {
		assert_eq!(detect_mode("@packed Team@(Arsenal)"), Mode::Packed);
	}

	#[test]
	fn auto_detection_recognizes_a_bare_packed_body() {
		assert_eq!(detect_mode("Team@(Arsenal EPL)"), Mode::Packed);
	}

	fn team_schema() -> Schema {
		let mut b = SchemaBuilder::new();
		b.add_type(
			"Team",
			TypeDef::new_struct(crate::schema::StructDef::new(vec![
				FieldDef::new("name", FieldType::Str),
				FieldDef::new("league", FieldType::Str).optional(),
			])),
		);
		b.build().unwrap()
	}

	#[test]
	fn select_mode_prefers_tabular_for_long_uniform_lists() {
		let schema = team_schema();
		let rows = vec![
			Value::strct("Team", vec![("name".into(), Value::str("a"))]),
			Value::strct("Team", vec![("name".into(), Value::str("b"))]),
			Value::strct("Team", vec![("name".into(), Value::str("c"))]),
		];
		assert_eq!(select_mode(&Value::list(rows), &schema, DEFAULT_TAB_THRESHOLD), Mode::Tabular);
	}

	#[test]
	fn select_mode_falls_back_to_packed_for_a_single_struct() {
		let schema = team_schema();
		let value = Value::strct("Team", vec![("name".into(), Value::str("a"))]);
		assert_eq!(select_mode(&value, &schema, DEFAULT_TAB_THRESHOLD), Mode::Packed);
	}

	#[test]
	fn select_mode_falls_back_to_struct_for_anything_else() {
		let schema = team_schema();
		let value = Value::map(vec![("a".into(), Value::int(1))]);
		assert_eq!(select_mode(&value, &schema, DEFAULT_TAB_THRESHOLD), Mode::Struct);
	}
}
