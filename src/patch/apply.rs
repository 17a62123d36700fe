//! Apply a patch to a base value (spec §4.7 "Apply semantics").

use super::{resolve_path_fids, Op, OpKind, Patch, Seg};
use crate::error::{GlyphError, GlyphErrorKind};
use crate::schema::Schema;
use crate::value::{Value, ValueKind};

/// Apply `patch` to `base`, returning the patched value. `base` is
/// untouched — patching clones first, consistent with values being
/// logically immutable elsewhere in the codec (spec §9).
///
/// When `patch.base_fingerprint` is set, it is compared against
/// `canonical_hash(base, schema)` before any op runs; a mismatch fails
/// with [`GlyphErrorKind::BaseFingerprintMismatch`] and `base` is returned
/// unmodified rather than partially patched (spec §4.7 "Base fingerprint").
///
/// FID-only path segments are resolved to field names first, which
/// requires `schema` and `patch.target_type` — a patch built entirely from
/// name segments (the common case when the caller already holds the
/// schema) can be applied with `schema: None`.
pub fn apply(base: &Value, patch: &Patch, schema: Option<&Schema>) -> Result<Value, GlyphError> {
	if let Some(expected) = &patch.base_fingerprint {
		let actual = crate::emit::canonical_hash(base, schema)?;
		if &actual != expected {
			return Err(GlyphError::new(
				GlyphErrorKind::BaseFingerprintMismatch,
				format!("base fingerprint mismatch: patch expects {expected:?}, document is {actual:?}"),
			));
		}
	}

	let mut out = base.clone();
	for op in &patch.ops {
		let resolved_path;
		let path = match (schema, &patch.target_type) {
			(Some(schema), Some(root_type)) => {
				resolved_path = resolve_path_fids(&op.path, root_type, schema)?;
				&resolved_path
			}
			_ => &op.path,
		};
		apply_one(&mut out, op.kind, path, op.index, op.value.as_ref())?;
	}
	Ok(out)
}

/// Apply a bare op list with no target/schema wrapper — used by tests and
/// by callers that already resolved every path to field names.
pub fn apply_ops(base: &Value, ops: &[Op]) -> Result<Value, GlyphError> {
	let mut out = base.clone();
	for op in ops {
		apply_one(&mut out, op.kind, &op.path, op.index, op.value.as_ref())?;
	}
	Ok(out)
}

fn apply_one(
	root: &mut Value,
	kind: OpKind,
	path: &super::Path,
	index: Option<usize>,
	value: Option<&Value>,
) -> Result<(), GlyphError> {
	match kind {
		OpKind::Set => {
			let value = value.cloned().ok_or_else(|| bad_path("Set op is missing its value"))?;
			set_at(root, &path.0, value)
		}
		OpKind::Delete => delete_at(root, &path.0),
		OpKind::Append => {
			let value = value.cloned().ok_or_else(|| bad_path("Append op is missing its value"))?;
			append_at(root, &path.0, index, value)
		}
		OpKind::Delta => {
			let delta = match value.map(|v| &v.kind) {
				Some(ValueKind::Int(n)) => *n as f64,
				Some(ValueKind::Float(f)) => *f,
				_ => return Err(GlyphError::new(GlyphErrorKind::DeltaOnNonNumeric, "delta op's own value is not numeric")),
			};
			delta_at(root, &path.0, delta)
		}
	}
}

fn bad_path(msg: impl Into<String>) -> GlyphError {
	GlyphError::new(GlyphErrorKind::BadPath, msg.into())
}

fn field_name(seg: &Seg) -> Result<&str, GlyphError> {
	match seg {
		Seg::Field { name, .. } if !name.is_empty() => Ok(name),
		Seg::Field { fid, .. } => Err(GlyphError::new(GlyphErrorKind::UnknownFID, format!("FID #{fid} was never resolved to a field name — apply with a schema"))),
		Seg::Index(_) => Err(bad_path("expected a field segment, found an index")),
	}
}

fn navigate<'a>(root: &'a mut Value, segments: &[Seg]) -> Result<&'a mut Value, GlyphError> {
	let mut current = root;
	for seg in segments {
		current = match seg {
			Seg::Field { .. } => {
				let key = field_name(seg)?;
				current.get_mut(key).ok_or_else(|| bad_path(format!("no such key {key:?} along patch path")))?
			}
			Seg::Index(i) => match &mut current.kind {
				ValueKind::List(items) => items.get_mut(*i).ok_or_else(|| bad_path(format!("list index {i} out of range")))?,
				_ => return Err(bad_path("indexed into a non-list value")),
			},
		};
	}
	Ok(current)
}

/// Like [`navigate`], but `Set` creates an empty intermediate map at any
/// missing field segment instead of failing, so a path into an absent
/// subtree still applies (spec §4.7 "Apply semantics": "`Set` creates
/// intermediate maps as needed"). Index segments are never auto-created —
/// there's no well-defined list to conjure, so a missing index still errors.
fn navigate_create<'a>(root: &'a mut Value, segments: &[Seg]) -> Result<&'a mut Value, GlyphError> {
	let mut current = root;
	for seg in segments {
		current = match seg {
			Seg::Field { .. } => {
				let key = field_name(seg)?.to_string();
				match &mut current.kind {
					ValueKind::Map(entries) => {
						if !entries.iter().any(|(ek, _)| ek == &key) {
							entries.push((key.clone(), Value::map(Vec::new())));
						}
						entries.iter_mut().find(|(ek, _)| ek == &key).map(|(_, v)| v).unwrap()
					}
					ValueKind::Struct(s) => {
						if !s.fields.iter().any(|(ek, _)| ek == &key) {
							s.fields.push((key.clone(), Value::map(Vec::new())));
						}
						s.fields.iter_mut().find(|(ek, _)| ek == &key).map(|(_, v)| v).unwrap()
					}
					_ => return Err(bad_path(format!("cannot create intermediate key {key:?} on a non-map/struct value"))),
				}
			}
			Seg::Index(i) => match &mut current.kind {
				ValueKind::List(items) => items.get_mut(*i).ok_or_else(|| bad_path(format!("list index {i} out of range")))?,
				_ => return Err(bad_path("indexed into a non-list value")),
			},
		};
	}
	Ok(current)
}

fn set_at(root: &mut Value, segments: &[Seg], value: Value) -> Result<(), GlyphError> {
	let Some((last, parents)) = segments.split_last() else {
		*root = value;
		return Ok(());
	};
	let parent = navigate_create(root, parents)?;
	match last {
		Seg::Field { .. } => {
			let key = field_name(last)?.to_string();
			match &mut parent.kind {
				ValueKind::Map(entries) => match entries.iter_mut().find(|(ek, _)| ek == &key) {
					Some(entry) => entry.1 = value,
					None => entries.push((key, value)),
				},
				ValueKind::Struct(s) => match s.fields.iter_mut().find(|(ek, _)| ek == &key) {
					Some(entry) => entry.1 = value,
					None => s.fields.push((key, value)),
				},
				_ => return Err(bad_path("cannot set a key on a non-map/struct value")),
			}
			Ok(())
		}
		Seg::Index(i) => match &mut parent.kind {
			ValueKind::List(items) => {
				let slot = items.get_mut(*i).ok_or_else(|| bad_path(format!("list index {i} out of range")))?;
				*slot = value;
				Ok(())
			}
			_ => Err(bad_path("cannot index into a non-list value")),
		},
	}
}

/// `Delete` on a missing path is a no-op (spec §4.7 "Apply semantics").
fn delete_at(root: &mut Value, segments: &[Seg]) -> Result<(), GlyphError> {
	let Some((last, parents)) = segments.split_last() else {
		return Err(bad_path("cannot delete the document root"));
	};
	let Ok(parent) = navigate(root, parents) else {
		return Ok(());
	};
	match last {
		Seg::Field { .. } => {
			let key = field_name(last)?;
			match &mut parent.kind {
				ValueKind::Map(entries) => entries.retain(|(ek, _)| ek != key),
				ValueKind::Struct(s) => s.fields.retain(|(ek, _)| ek != key),
				_ => {}
			}
		}
		Seg::Index(i) => {
			if let ValueKind::List(items) = &mut parent.kind {
				if *i < items.len() {
					items.remove(*i);
				}
			}
		}
	}
	Ok(())
}

/// `Append` on a missing list creates an empty list first (spec §4.7).
fn append_at(root: &mut Value, segments: &[Seg], index: Option<usize>, value: Value) -> Result<(), GlyphError> {
	let Some((last, parents)) = segments.split_last() else {
		return Err(bad_path("cannot append at the document root"));
	};
	let parent = navigate(root, parents)?;
	let list = match last {
		Seg::Field { .. } => {
			let key = field_name(last)?.to_string();
			let slot = match &mut parent.kind {
				ValueKind::Map(entries) => {
					if !entries.iter().any(|(ek, _)| ek == &key) {
						entries.push((key.clone(), Value::list(Vec::new())));
					}
					entries.iter_mut().find(|(ek, _)| ek == &key).map(|(_, v)| v)
				}
				ValueKind::Struct(s) => {
					if !s.fields.iter().any(|(ek, _)| ek == &key) {
						s.fields.push((key.clone(), Value::list(Vec::new())));
					}
					s.fields.iter_mut().find(|(ek, _)| ek == &key).map(|(_, v)| v)
				}
				_ => None,
			};
			slot.ok_or_else(|| bad_path("cannot append a field on a non-map/struct value"))?
		}
		Seg::Index(i) => match &mut parent.kind {
			ValueKind::List(items) => items.get_mut(*i).ok_or_else(|| bad_path(format!("list index {i} out of range")))?,
			_ => return Err(bad_path("cannot index into a non-list value")),
		},
	};
	match &mut list.kind {
		ValueKind::List(items) => {
			let at = index.unwrap_or(items.len());
			if at > items.len() {
				return Err(bad_path("append index is past the end of the list"));
			}
			items.insert(at, value);
			Ok(())
		}
		_ => Err(bad_path("cannot append into a non-list value")),
	}
}

fn delta_at(root: &mut Value, segments: &[Seg], delta: f64) -> Result<(), GlyphError> {
	let target = navigate(root, segments)?;
	match &mut target.kind {
		ValueKind::Int(n) => {
			*n += delta as i64;
			Ok(())
		}
		ValueKind::Float(f) => {
			*f += delta;
			Ok(())
		}
		_ => Err(GlyphError::new(GlyphErrorKind::DeltaOnNonNumeric, "delta applied to a non-numeric value")),
	}
}
