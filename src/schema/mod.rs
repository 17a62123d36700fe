//! Named type definitions, constraints, and stable field identifiers (spec §3)

mod builder;
mod context;
mod fid;
mod hash;
mod registry;

pub use builder::SchemaBuilder;
pub use context::SchemaContext;
pub use registry::SchemaRegistry;

use std::collections::BTreeMap;

use crate::error::{GlyphError, GlyphErrorKind};
use crate::value::Value;

/// The declared shape of a field or sum-variant payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
	Null,
	Bool,
	Int,
	Float,
	Str,
	Bytes,
	Time,
	Ref,
	List(Box<FieldType>),
	Map(Box<FieldType>),
	/// Names another struct type in the same schema.
	Struct(String),
	/// Names another sum type in the same schema.
	Sum(String),
	/// Accepts any value; used by `open` structs' `@unknown` bag and by
	/// fields that deliberately don't constrain their payload.
	Any,
}

impl FieldType {
	/// The struct/sum type name this field type recurses into, if any.
	pub fn named_type(&self) -> Option<&str> {
		match self {
			FieldType::Struct(n) | FieldType::Sum(n) => Some(n),
			FieldType::List(inner) | FieldType::Map(inner) => inner.named_type(),
			_ => None,
		}
	}
}

/// Value-level constraints checked outside the grammar (by the schema-aware
/// parser and by the streaming validator).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub pattern: Option<String>,
	pub min_len: Option<usize>,
	pub max_len: Option<usize>,
}

/// A single field of a [`StructDef`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
	pub name: String,
	pub ty: FieldType,
	pub constraints: Constraints,
	pub wire_key: Option<String>,
	pub optional: bool,
	pub default: Option<Value>,
	/// Stable field identifier. `0` means unassigned until `assign_fids` runs.
	pub fid: u32,
	pub keep_null: bool,
	pub codec: Option<String>,
}

impl FieldDef {
	pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
		Self {
			name: name.into(),
			ty,
			constraints: Constraints::default(),
			wire_key: None,
			optional: false,
			default: None,
			fid: 0,
			keep_null: false,
			codec: None,
		}
	}

	pub fn optional(mut self) -> Self {
		self.optional = true;
		self
	}

	pub fn with_wire_key(mut self, key: impl Into<String>) -> Self {
		self.wire_key = Some(key.into());
		self
	}

	pub fn with_fid(mut self, fid: u32) -> Self {
		self.fid = fid;
		self
	}

	pub fn keep_null(mut self) -> Self {
		self.keep_null = true;
		self
	}

	/// A field "is present" in packed/tabular encodings when its value is
	/// non-null, or it is flagged `keep_null` (spec §4.5).
	pub fn is_present(&self, value: &Value) -> bool {
		!value.is_null() || self.keep_null
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
	pub fields: Vec<FieldDef>,
}

impl StructDef {
	pub fn new(fields: Vec<FieldDef>) -> Self {
		Self { fields }
	}

	/// Resolve a field by name, then by wire key (spec §3 invariant 2).
	pub fn field_by_key(&self, key: &str) -> Option<&FieldDef> {
		self.fields
			.iter()
			.find(|f| f.name == key)
			.or_else(|| self.fields.iter().find(|f| f.wire_key.as_deref() == Some(key)))
	}

	pub fn field_by_fid(&self, fid: u32) -> Option<&FieldDef> {
		self.fields.iter().find(|f| f.fid == fid)
	}

	/// Required fields then optional fields, each block sorted by FID
	/// ascending (unassigned FID `0` sorts last within its block), per spec
	/// §3 invariant 4.
	pub fn packed_field_order(&self) -> Vec<&FieldDef> {
		let mut required: Vec<&FieldDef> = self.fields.iter().filter(|f| !f.optional).collect();
		let mut optional: Vec<&FieldDef> = self.fields.iter().filter(|f| f.optional).collect();
		let by_fid = |a: &&FieldDef, b: &&FieldDef| {
			let ka = if a.fid == 0 { u32::MAX } else { a.fid };
			let kb = if b.fid == 0 { u32::MAX } else { b.fid };
			ka.cmp(&kb)
		};
		required.sort_by(by_fid);
		optional.sort_by(by_fid);
		required.into_iter().chain(optional).collect()
	}

	/// Just the optional fields, FID-ascending — the bitmap's bit order
	/// (spec §4.5).
	pub fn optional_fields_in_fid_order(&self) -> Vec<&FieldDef> {
		let mut optional: Vec<&FieldDef> = self.fields.iter().filter(|f| f.optional).collect();
		optional.sort_by_key(|f| if f.fid == 0 { u32::MAX } else { f.fid });
		optional
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumVariant {
	pub tag: String,
	pub ty: Option<FieldType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumDef {
	pub variants: Vec<SumVariant>,
}

impl SumDef {
	pub fn variant(&self, tag: &str) -> Option<&SumVariant> {
		self.variants.iter().find(|v| v.tag == tag)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
	Struct(StructDef),
	Sum(SumDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
	pub kind: TypeDefKind,
	pub version: u32,
	pub pack_enabled: bool,
	pub tab_enabled: bool,
	pub open: bool,
}

impl TypeDef {
	pub fn new_struct(def: StructDef) -> Self {
		Self { kind: TypeDefKind::Struct(def), version: 1, pack_enabled: true, tab_enabled: true, open: false }
	}

	pub fn new_sum(def: SumDef) -> Self {
		Self { kind: TypeDefKind::Sum(def), version: 1, pack_enabled: false, tab_enabled: false, open: false }
	}

	pub fn as_struct(&self) -> Option<&StructDef> {
		match &self.kind {
			TypeDefKind::Struct(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_sum(&self) -> Option<&SumDef> {
		match &self.kind {
			TypeDefKind::Sum(s) => Some(s),
			_ => None,
		}
	}
}

/// An immutable, built schema: a mapping from type name to [`TypeDef`],
/// plus the schema's canonical hash.
///
/// Built once via [`SchemaBuilder::build`] and shared thereafter (spec §5,
/// §9: "Schema as shared ownership").
#[derive(Debug, Clone)]
pub struct Schema {
	types: BTreeMap<String, TypeDef>,
	hash: String,
}

impl Schema {
	pub fn get(&self, type_name: &str) -> Option<&TypeDef> {
		self.types.get(type_name)
	}

	pub fn require(&self, type_name: &str) -> Result<&TypeDef, GlyphError> {
		self.get(type_name).ok_or_else(|| {
			GlyphError::new(GlyphErrorKind::UnknownType, format!("unknown type {type_name:?}"))
		})
	}

	pub fn type_names(&self) -> impl Iterator<Item = &str> {
		self.types.keys().map(|s| s.as_str())
	}

	/// Canonical hash of the whole built schema (SHA-256, first 16 bytes
	/// hex), used to key `@schema#<hash>` headers (spec §3, §4.7).
	pub fn hash(&self) -> &str {
		&self.hash
	}
}
