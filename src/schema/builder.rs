use std::collections::BTreeMap;

use super::fid::assign_fids;
use super::hash::schema_hash;
use super::{Schema, TypeDef, TypeDefKind};
use crate::error::{GlyphError, GlyphErrorKind};

/// Accumulates type definitions and produces a frozen [`Schema`].
///
/// Mirrors the teacher's `SchemaMut` → `Schema::freeze` pattern
/// (`schema/safe/mod.rs`): an editable representation that validates and
/// assigns derived state (here, FIDs and the schema hash) exactly once, on
/// `build`.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
	types: BTreeMap<String, TypeDef>,
}

impl SchemaBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_type(&mut self, name: impl Into<String>, def: TypeDef) -> &mut Self {
		self.types.insert(name.into(), def);
		self
	}

	/// Assign FIDs to every struct type's unassigned fields, validate
	/// uniqueness, and freeze into an immutable [`Schema`].
	pub fn build(mut self) -> Result<Schema, GlyphError> {
		for def in self.types.values_mut() {
			if let TypeDefKind::Struct(s) = &mut def.kind {
				assign_fids(&mut s.fields);
			}
		}
		for (name, def) in &self.types {
			if let TypeDefKind::Struct(s) = &def.kind {
				let mut seen = std::collections::HashSet::new();
				for f in &s.fields {
					if !seen.insert(f.fid) {
						return Err(GlyphError::new(
							GlyphErrorKind::TypeMismatch,
							format!("duplicate FID {} in type {name:?}", f.fid),
						));
					}
				}
			}
		}
		for def in self.types.values() {
			if let TypeDefKind::Struct(s) = &def.kind {
				for f in &s.fields {
					if let Some(named) = f.ty.named_type() {
						if !self.types.contains_key(named) {
							return Err(GlyphError::new(
								GlyphErrorKind::UnknownType,
								format!("field {:?} references undefined type {named:?}", f.name),
							));
						}
					}
				}
			}
		}
		let hash = schema_hash(&self.types);
		Ok(Schema { types: self.types, hash })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{FieldDef, FieldType, StructDef};

	#[test]
	fn build_assigns_fids_and_hashes() {
		let mut b = SchemaBuilder::new();
		b.add_type(
			"Team",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("id", FieldType::Str),
				FieldDef::new("name", FieldType::Str),
			])),
		);
		let schema = b.build().unwrap();
		let team = schema.require("Team").unwrap().as_struct().unwrap();
		assert_eq!(team.fields[0].fid, 1);
		assert_eq!(team.fields[1].fid, 2);
		assert_eq!(schema.hash().len(), 32);
	}

	#[test]
	fn duplicate_fid_rejected() {
		let mut b = SchemaBuilder::new();
		b.add_type(
			"Team",
			TypeDef::new_struct(StructDef::new(vec![
				FieldDef::new("a", FieldType::Str).with_fid(1),
				FieldDef::new("b", FieldType::Str).with_fid(1),
			])),
		);
		assert!(b.build().is_err());
	}

	#[test]
	fn unknown_referenced_type_rejected() {
		let mut b = SchemaBuilder::new();
		b.add_type(
			"Match",
			TypeDef::new_struct(StructDef::new(vec![FieldDef::new("home", FieldType::Struct("Team".into()))])),
		);
		assert!(b.build().is_err());
	}
}
