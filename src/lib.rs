//! # Getting started
//!
//! ```
//! use glyph::schema::{FieldDef, FieldType, SchemaBuilder, StructDef, TypeDef};
//!
//! let mut builder = SchemaBuilder::new();
//! builder.add_type(
//! 	"Team",
//! 	TypeDef::new_struct(StructDef::new(vec![
//! 		FieldDef::new("name", FieldType::Str),
//! 		FieldDef::new("xH", FieldType::Float).optional(),
//! 	])),
//! );
//! let schema = builder.build().expect("schema builds");
//!
//! let value = glyph::value::Value::strct(
//! 	"Team",
//! 	vec![("name".into(), glyph::value::Value::str("Arsenal"))],
//! );
//!
//! let text = glyph::to_canonical(&value, Some(&schema)).expect("canonical form");
//! let (_, parsed) = glyph::from_text(&text).expect("tolerant parse");
//! assert_eq!(parsed.get("name"), value.get("name"));
//! ```
//!
//! # What's here
//!
//! - [`lexer`] and [`parser`] implement the tolerant text grammar (grammar
//!   reference: spec §6) that never hard-fails on malformed input, instead
//!   collecting [`error::Diagnostic`]s a caller can choose to act on.
//! - [`emit`] implements the canonical emitter: the single deterministic
//!   rendering every encoder and the canonical hash agree on.
//! - [`schema`] is the type system — struct/sum definitions, stable field
//!   identifiers, constraints, and the [`schema::SchemaContext`] key
//!   dictionary that v2's packed/tabular modes compress against.
//! - [`v2`] adds the struct/packed/tabular wire modes selected by a
//!   document's header directive.
//! - [`patch`] is the diff/apply/textual-form algebra for sending small,
//!   cheap updates to an already-seen value instead of re-sending it whole.
//! - [`validator`] validates a streaming tool call against a
//!   [`validator::ToolRegistry`] token by token, rejecting an unknown tool
//!   the moment its name arrives instead of waiting for the whole payload.
//! - [`json_bridge`] converts to and from `serde_json::Value`, either
//!   strictly (native JSON types only) or losslessly (via `$glyph` marker
//!   objects for the kinds JSON has no native slot for).
//! - [`blob`] is the content-addressed store blob references resolve
//!   against.

pub mod blob;
pub mod emit;
pub mod error;
pub mod json_bridge;
pub mod lexer;
pub mod parser;
pub mod patch;
pub mod schema;
pub mod v2;
pub mod validator;
pub mod value;

pub use error::{GlyphError, GlyphErrorKind};
pub use schema::Schema;
pub use value::Value;

/// Parse `src` with the tolerant grammar, discarding any header directive
/// and returning the first diagnostic as a hard error, if there was one.
///
/// For documents with a v2 mode header (`@packed`, `@tab`, `@patch`), use
/// [`v2::decode`] or [`patch::parse_patch`] instead — this function only
/// understands the plain struct mode (spec §4.4 "default: struct mode").
pub fn from_text(src: &str) -> Result<(parser::Header, Value), GlyphError> {
	parser::parse_strict(src)
}

/// Emit `value` in canonical form (spec §4.3): the single deterministic
/// rendering the canonical hash is computed from.
pub fn to_canonical(value: &Value, schema: Option<&Schema>) -> Result<String, GlyphError> {
	emit::emit(value, schema, &emit::EmitOptions::canonical_hash_options())
}

/// The canonical hash of `value` (spec §4.3, glossary "FNV-1a-64"):
/// `canonical_hash(a) == canonical_hash(b)` iff `a` and `b` carry the same
/// data under canonical emission.
pub fn canonical_hash(value: &Value, schema: Option<&Schema>) -> Result<String, GlyphError> {
	emit::canonical_hash(value, schema)
}
