//! Structural diff between two values (spec §4.7 "diff").

use super::{Op, Path};
use crate::value::{Value, ValueKind};

/// Diff `old` into `new`, producing the operations [`super::apply::apply_ops`]
/// needs to turn `old` into something equal to `new`.
///
/// On a primitive mismatch (scalars included) this emits a `Set` per spec
/// §4.7 — `Delta` is a wire form hand-authored patches may use, but `diff`
/// itself never infers one, so `apply(v, diff(v, w))` reproduces `w` exactly
/// rather than drifting on float arithmetic. Lists of differing length diff
/// to a single whole-list `Set` rather than an element-wise edit script
/// (SPEC_FULL.md §12.2 resolves the open question of list-diff granularity
/// this way — a full Myers edit script is out of scope for the patch
/// algebra's compactness goal). Paths are built from field names; pass the
/// result through [`super::resolve_path_fids`] afterwards to switch a patch
/// to FID addressing before emitting it.
pub fn diff(old: &Value, new: &Value) -> Vec<Op> {
	let mut ops = Vec::new();
	diff_into(&Path::root(), old, new, &mut ops);
	ops
}

fn diff_into(path: &Path, old: &Value, new: &Value, ops: &mut Vec<Op>) {
	match (&old.kind, &new.kind) {
		(ValueKind::Map(old_entries), ValueKind::Map(new_entries)) => {
			diff_pairs(path, old_entries, new_entries, ops);
		}
		(ValueKind::Struct(a), ValueKind::Struct(b)) if a.type_name == b.type_name => {
			diff_pairs(path, &a.fields, &b.fields, ops);
		}
		(ValueKind::List(a), ValueKind::List(b)) if a.len() == b.len() => {
			for (i, (av, bv)) in a.iter().zip(b.iter()).enumerate() {
				diff_into(&path.clone().push_index(i), av, bv, ops);
			}
		}
		_ => {
			if old != new {
				ops.push(Op::set(path.clone(), new.clone()));
			}
		}
	}
}

fn diff_pairs(path: &Path, old_entries: &[(String, Value)], new_entries: &[(String, Value)], ops: &mut Vec<Op>) {
	for (key, old_value) in old_entries {
		match new_entries.iter().find(|(k, _)| k == key) {
			Some((_, new_value)) => diff_into(&path.clone().push_key(key.clone()), old_value, new_value, ops),
			None => ops.push(Op::delete(path.clone().push_key(key.clone()))),
		}
	}
	for (key, new_value) in new_entries {
		if !old_entries.iter().any(|(k, _)| k == key) {
			ops.push(Op::set(path.clone().push_key(key.clone()), new_value.clone()));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::patch::OpKind;

	#[test]
	fn scalar_set_on_numeric_change() {
		let old = Value::map(vec![("xH".into(), Value::float(1.72))]);
		let new = Value::map(vec![("xH".into(), Value::float(1.9))]);
		let ops = diff(&old, &new);
		assert_eq!(ops.len(), 1);
		assert_eq!(ops[0].kind, OpKind::Set);
		let v = match &ops[0].value.as_ref().unwrap().kind {
			crate::value::ValueKind::Float(f) => *f,
			other => panic!("expected a float value, got {other:?}"),
		};
		assert!((v - 1.9).abs() < 1e-9);
	}

	#[test]
	fn added_and_removed_keys() {
		let old = Value::map(vec![("a".into(), Value::int(1))]);
		let new = Value::map(vec![("b".into(), Value::int(2))]);
		let ops = diff(&old, &new);
		assert!(ops.iter().any(|op| op.kind == OpKind::Delete));
		assert!(ops.iter().any(|op| op.kind == OpKind::Set));
	}

	#[test]
	fn unchanged_values_produce_no_ops() {
		let v = Value::map(vec![("a".into(), Value::int(1))]);
		assert!(diff(&v, &v).is_empty());
	}

	#[test]
	fn nested_struct_field_diffs_by_path() {
		let old = Value::strct("Match", vec![("home".into(), Value::map(vec![("xH".into(), Value::float(1.0))]))]);
		let new = Value::strct("Match", vec![("home".into(), Value::map(vec![("xH".into(), Value::float(1.5))]))]);
		let ops = diff(&old, &new);
		assert_eq!(ops[0].kind, OpKind::Set);
		assert_eq!(ops[0].path.to_string(), "home.xH");
	}

	#[test]
	fn whole_list_set_on_length_change() {
		let old = Value::list(vec![Value::int(1), Value::int(2)]);
		let new = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
		let ops = diff(&old, &new);
		assert_eq!(ops.len(), 1);
		assert_eq!(ops[0].kind, OpKind::Set);
		assert_eq!(ops[0].path, Path::root());
	}
}
