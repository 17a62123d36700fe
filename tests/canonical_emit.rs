use {pretty_assertions::assert_eq, glyph::emit::{canonical_hash, emit, EmitOptions}, glyph::value::Value};

#[test]
fn scenario_a_canonical_struct_matches_the_documented_wire_form() {
	let home = Value::map(vec![("t".into(), Value::str("ARS")), ("n".into(), Value::str("Arsenal"))]);
	let v = Value::map(vec![
		("id".into(), Value::str("m:ARS-LIV")),
		("home".into(), home),
		("xH".into(), Value::float(1.72)),
	]);
	let text = emit(&v, None, &EmitOptions::canonical_hash_options()).unwrap();
	assert_eq!(text, "{home:{n:Arsenal t:ARS} id:m:ARS-LIV xH:1.72}");
}

#[test]
fn canonical_hash_is_stable_across_field_insertion_order() {
	let a = Value::map(vec![("a".into(), Value::int(1)), ("b".into(), Value::int(2))]);
	let b = Value::map(vec![("b".into(), Value::int(2)), ("a".into(), Value::int(1))]);
	assert_eq!(canonical_hash(&a, None).unwrap(), canonical_hash(&b, None).unwrap());
}

#[test]
fn canonical_hash_changes_when_a_value_changes() {
	let a = Value::map(vec![("a".into(), Value::int(1))]);
	let b = Value::map(vec![("a".into(), Value::int(2))]);
	assert_ne!(canonical_hash(&a, None).unwrap(), canonical_hash(&b, None).unwrap());
}

#[test]
fn non_finite_floats_are_rejected_by_default() {
	let v = Value::map(vec![("x".into(), Value::float(f64::NAN))]);
	assert!(emit(&v, None, &EmitOptions::canonical_hash_options()).is_err());
}
