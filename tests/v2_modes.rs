use {
	pretty_assertions::assert_eq,
	glyph::parser::directives::KeyMode,
	glyph::schema::{FieldDef, FieldType, SchemaBuilder, StructDef, TypeDef},
	glyph::v2::{packed, tabular},
	glyph::value::Value,
};

fn team_schema() -> glyph::schema::Schema {
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

#[test]
fn scenario_b_packed_dense_matches_the_documented_wire_form() {
	let schema = team_schema();
	let value = Value::strct(
		"Team",
		vec![
			("id".into(), Value::reference(Some("t".into()), "ARS")),
			("name".into(), Value::str("Arsenal")),
			("league".into(), Value::str("EPL")),
		],
	);
	let encoded = packed::encode(&value, "Team", &schema).unwrap();
	assert_eq!(encoded, "Team@(^t:ARS Arsenal EPL)");

	let def = schema.get("Team").unwrap().as_struct().unwrap();
	let body = encoded.strip_prefix("Team@").unwrap();
	let decoded = packed::decode(body, "Team", def).unwrap();
	assert_eq!(decoded.get("name"), Some(&Value::str("Arsenal")));
	assert_eq!(decoded.get("league"), Some(&Value::str("EPL")));
}

#[test]
fn tabular_round_trips_a_batch_of_rows() {
	let schema = team_schema();
	let rows = vec![
		Value::strct(
			"Team",
			vec![
				("id".into(), Value::reference(Some("t".into()), "ARS")),
				("name".into(), Value::str("Arsenal")),
				("league".into(), Value::str("EPL")),
			],
		),
		Value::strct(
			"Team",
			vec![
				("id".into(), Value::reference(Some("t".into()), "LIV")),
				("name".into(), Value::str("Liverpool")),
				("league".into(), Value::str("EPL")),
			],
		),
	];
	let encoded = tabular::encode(&rows, "Team", &schema, KeyMode::Name).unwrap();
	assert!(encoded.starts_with("@tab Team"), "got {encoded:?}");

	let def = schema.get("Team").unwrap().as_struct().unwrap();
	let body = encoded.strip_prefix("@tab ").unwrap();
	let decoded = tabular::decode(body, "Team", def).unwrap();
	assert_eq!(decoded.len(), 2);
	assert_eq!(decoded[1].get("name"), Some(&Value::str("Liverpool")));
}

#[test]
fn v2_decode_dispatches_on_the_header_mode() {
	let schema = team_schema();
	let value = Value::strct(
		"Team",
		vec![
			("id".into(), Value::reference(Some("t".into()), "ARS")),
			("name".into(), Value::str("Arsenal")),
			("league".into(), Value::str("EPL")),
		],
	);
	let packed_body = packed::encode(&value, "Team", &schema).unwrap();
	let src = format!("@packed {packed_body}");
	let decoded = glyph::v2::decode(&src, &schema).unwrap();
	assert_eq!(decoded.get("name"), Some(&Value::str("Arsenal")));
}
