//! The patch algebra (spec §4.7): diff two values into a compact op list,
//! apply an op list to a base value, and serialize/parse the textual
//! patch form that travels over the wire.

pub mod apply;
pub mod diff;
pub mod textual;

use crate::error::{GlyphError, GlyphErrorKind};
use crate::schema::Schema;
use crate::value::{RefId, Value};

/// One step into a value tree (spec §9 "path model"): a discriminated union
/// `{Field(name, fid), Index(i)}`. A path built from text before FID
/// resolution may carry a `Field` segment with an empty `name` (parsed from
/// `#<fid>`) or with `fid == 0` (parsed from a bare name) — [`resolve_path_fids`]
/// fills in whichever half is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seg {
	Field { name: String, fid: u32 },
	Index(usize),
}

impl Seg {
	pub fn field(name: impl Into<String>) -> Self {
		Seg::Field { name: name.into(), fid: 0 }
	}
	pub fn fid(fid: u32) -> Self {
		Seg::Field { name: String::new(), fid }
	}
}

/// A path into a value tree, e.g. `home.lineup[2].name` or `home.#7`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(pub Vec<Seg>);

impl Path {
	pub fn root() -> Self {
		Path(Vec::new())
	}

	pub fn push_key(mut self, key: impl Into<String>) -> Self {
		self.0.push(Seg::field(key));
		self
	}

	pub fn push_fid(mut self, fid: u32) -> Self {
		self.0.push(Seg::fid(fid));
		self
	}

	pub fn push_index(mut self, index: usize) -> Self {
		self.0.push(Seg::Index(index));
		self
	}
}

impl std::fmt::Display for Path {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut first = true;
		for seg in &self.0 {
			match seg {
				Seg::Field { name, fid } => {
					if !first {
						write!(f, ".")?;
					}
					if !name.is_empty() {
						write!(f, "{name}")?;
					} else {
						write!(f, "#{fid}")?;
					}
				}
				Seg::Index(idx) => write!(f, "[{idx}]")?,
			}
			first = false;
		}
		Ok(())
	}
}

/// Which mutation an [`Op`] performs (spec §4.7 "Operations").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
	/// `=` replace the value at `path`.
	Set,
	/// `+` append `value` to the list at `path` (or insert at `index` when set).
	Append,
	/// `-` remove the field/element at `path`.
	Delete,
	/// `~` numeric increment: add `value` to the number at `path`.
	Delta,
}

/// A single patch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
	pub kind: OpKind,
	pub path: Path,
	/// `Append`'s insertion point; `None` means "append at the end".
	pub index: Option<usize>,
	/// Carried by `Set`, `Append`, and `Delta` (the increment, as an Int or
	/// Float scalar); absent on `Delete`.
	pub value: Option<Value>,
}

impl Op {
	pub fn set(path: Path, value: Value) -> Self {
		Op { kind: OpKind::Set, path, index: None, value: Some(value) }
	}
	pub fn append(path: Path, value: Value, index: Option<usize>) -> Self {
		Op { kind: OpKind::Append, path, index, value: Some(value) }
	}
	pub fn delete(path: Path) -> Self {
		Op { kind: OpKind::Delete, path, index: None, value: None }
	}
	pub fn delta(path: Path, delta: f64) -> Self {
		Op { kind: OpKind::Delta, path, index: None, value: Some(Value::float(delta)) }
	}
}

/// A patch document (spec §4.7 "Patch model"): a target reference, the
/// schema the ops' FIDs/field names resolve against, an optional base
/// fingerprint guarding out-of-order application, and the ops themselves.
///
/// `target_type` is caller-supplied context (the struct type `target`
/// names) used to resolve FID-only path segments; it is not part of the
/// textual header grammar (spec §4.7's literal grammar has no `@type=`
/// slot) — a host that needs it round-tripped stores it out of band,
/// typically keyed by `target`'s ref prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
	pub target: RefId,
	pub schema_id: String,
	pub base_fingerprint: Option<String>,
	pub target_type: Option<String>,
	pub ops: Vec<Op>,
}

impl Patch {
	pub fn new(target: RefId, schema_id: impl Into<String>, ops: Vec<Op>) -> Self {
		Patch { target, schema_id: schema_id.into(), base_fingerprint: None, target_type: None, ops }
	}

	pub fn with_base_fingerprint(mut self, fp: impl Into<String>) -> Self {
		self.base_fingerprint = Some(fp.into());
		self
	}

	pub fn with_target_type(mut self, type_name: impl Into<String>) -> Self {
		self.target_type = Some(type_name.into());
		self
	}
}

/// Walk `path`, resolving each `Field` segment to both its `name` and `fid`
/// against `schema`, recursing through the schema along the declared type
/// of each visited field (spec §4.7 "Paths", §9 "Path model").
///
/// `Index` segments recurse into a `List`'s declared element type, if any.
/// Mixed FID+name segments in one path are fine — each is resolved
/// independently. Unknown FIDs and unknown field names both surface as
/// [`GlyphErrorKind::UnknownFID`] / [`GlyphErrorKind::UnknownField`]
/// respectively.
pub fn resolve_path_fids(path: &Path, root_type: &str, schema: &Schema) -> Result<Path, GlyphError> {
	use crate::schema::FieldType;

	let mut out = Vec::with_capacity(path.0.len());
	let mut current_ty = FieldType::Struct(root_type.to_string());
	for seg in &path.0 {
		match seg {
			Seg::Index(i) => {
				if let FieldType::List(inner) = &current_ty {
					current_ty = (**inner).clone();
				}
				out.push(Seg::Index(*i));
			}
			Seg::Field { name, fid } => {
				let type_name = current_ty.named_type().ok_or_else(|| {
					GlyphError::new(GlyphErrorKind::BadPath, format!("path segment {seg:?} does not land on a struct type"))
				})?;
				let def = schema
					.require(type_name)?
					.as_struct()
					.ok_or_else(|| GlyphError::new(GlyphErrorKind::TypeMismatch, format!("{type_name:?} is not a struct type")))?;
				let field = if *fid != 0 {
					def.field_by_fid(*fid)
						.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnknownFID, format!("unknown FID #{fid} on {type_name:?}")))?
				} else {
					def.field_by_key(name)
						.ok_or_else(|| GlyphError::new(GlyphErrorKind::UnknownField, format!("unknown field {name:?} on {type_name:?}")))?
				};
				out.push(Seg::Field { name: field.name.clone(), fid: field.fid });
				current_ty = field.ty.clone();
			}
		}
	}
	Ok(Path(out))
}

/// Canonical sort key for one op (spec §4.7 "Canonical sort"): each path
/// segment sorts on its FID when present, else its field name; ties break
/// on op kind (`Set < Append < Delete < Delta`), then on the op's emitted
/// value text.
fn sort_key(op: &Op) -> (Vec<(u8, String)>, u8, String) {
	let segs = op
		.path
		.0
		.iter()
		.map(|seg| match seg {
			Seg::Field { fid, .. } if *fid != 0 => (0u8, format!("{fid:020}")),
			Seg::Field { name, .. } => (1u8, name.clone()),
			Seg::Index(i) => (2u8, format!("{i:020}")),
		})
		.collect();
	let kind_rank = match op.kind {
		OpKind::Set => 0,
		OpKind::Append => 1,
		OpKind::Delete => 2,
		OpKind::Delta => 3,
	};
	let value_text = op
		.value
		.as_ref()
		.and_then(|v| crate::emit::emit(v, None, &crate::emit::EmitOptions::canonical_hash_options()).ok())
		.unwrap_or_default();
	(segs, kind_rank, value_text)
}

/// Sort `ops` into canonical order in place (spec §4.7 "Canonical sort",
/// used when a patch's `sort_ops` option is set).
pub fn sort_ops(ops: &mut [Op]) {
	ops.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

pub use apply::apply;
pub use diff::diff;
pub use textual::{emit_patch, parse_patch};

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldDef, FieldType, SchemaBuilder, StructDef, TypeDef};

	fn match_schema() -> Schema {
		let mut b = SchemaBuilder::new();
		b.add_type(
			"Team",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("name", FieldType::Str).with_fid(1),
			])),
		);
		b.add_type(
			"Match",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("score", FieldType::Int).with_fid(1),
				FieldDef::new("home", FieldType::Struct("Team".into())).with_fid(2),
			])),
		);
		b.build().unwrap()
	}

	#[test]
	fn resolves_fid_only_segment_to_its_name() {
		let schema = match_schema();
		let path = Path::root().push_fid(1);
		let resolved = resolve_path_fids(&path, "Match", &schema).unwrap();
		assert_eq!(resolved.0, vec![Seg::Field { name: "score".into(), fid: 1 }]);
	}

	#[test]
	fn resolves_name_only_segment_to_its_fid() {
		let schema = match_schema();
		let path = Path::root().push_key("score");
		let resolved = resolve_path_fids(&path, "Match", &schema).unwrap();
		assert_eq!(resolved.0, vec![Seg::Field { name: "score".into(), fid: 1 }]);
	}

	#[test]
	fn recurses_into_a_nested_struct_field() {
		let schema = match_schema();
		let path = Path::root().push_fid(2).push_key("name");
		let resolved = resolve_path_fids(&path, "Match", &schema).unwrap();
		assert_eq!(
			resolved.0,
			vec![Seg::Field { name: "home".into(), fid: 2 }, Seg::Field { name: "name".into(), fid: 1 }]
		);
	}

	#[test]
	fn unknown_fid_is_an_error() {
		let schema = match_schema();
		let path = Path::root().push_fid(99);
		let err = resolve_path_fids(&path, "Match", &schema).unwrap_err();
		assert_eq!(*err.kind(), GlyphErrorKind::UnknownFID);
	}

	#[test]
	fn canonical_sort_orders_by_fid_then_kind() {
		let mut ops = vec![
			Op::set(Path::root().push_fid(2), Value::int(1)),
			Op::delete(Path::root().push_fid(1)),
			Op::set(Path::root().push_fid(1), Value::int(2)),
		];
		sort_ops(&mut ops);
		assert_eq!(ops[0].path, Path::root().push_fid(1));
		assert_eq!(ops[0].kind, OpKind::Set);
		assert_eq!(ops[1].path, Path::root().push_fid(1));
		assert_eq!(ops[1].kind, OpKind::Delete);
		assert_eq!(ops[2].path, Path::root().push_fid(2));
	}
}
