use {
	pretty_assertions::assert_eq,
	glyph::schema::{Constraints, FieldDef, FieldType},
	glyph::validator::{ErrorCode, StreamingValidator, ToolRegistry, ToolSchema},
};

fn registry() -> ToolRegistry {
	let mut reg = ToolRegistry::new();
	let query = FieldDef {
		constraints: Constraints { min_len: Some(1), max_len: Some(64), ..Default::default() },
		..FieldDef::new("query", FieldType::Str)
	};
	reg.register(ToolSchema::new("search", vec![query]));
	reg
}

#[test]
fn scenario_f_streaming_reject_of_an_unregistered_tool() {
	let reg = registry();
	let mut v = StreamingValidator::new(&reg);

	v.push_token("{action=\"danger\" ");
	let result = v.push_token("");

	assert_eq!(result.tool_name.as_deref(), Some("danger"));
	assert!(!result.tool_allowed);
	assert_eq!(result.errors.len(), 1);
	assert_eq!(result.errors[0].code, ErrorCode::UnknownTool);
	assert!(v.should_stop());
}

#[test]
fn a_registered_tool_with_well_formed_args_completes_and_validates() {
	let reg = registry();
	let mut v = StreamingValidator::new(&reg);

	v.push_token("{action=\"search\" ");
	let result = v.push_token("query=\"arsenal fixtures\"}");

	assert!(result.complete);
	assert!(result.valid);
	assert!(result.tool_allowed);
	assert!(result.errors.is_empty());
}

#[test]
fn an_overlong_argument_is_reported_without_aborting_the_stream() {
	let reg = registry();
	let mut v = StreamingValidator::new(&reg);
	let overlong = "x".repeat(100);

	v.push_token("{action=\"search\" ");
	let result = v.push_token(&format!("query=\"{overlong}\"}}"));

	assert!(result.complete);
	assert!(!result.valid);
	assert!(result.errors.iter().any(|e| e.code == ErrorCode::ConstraintLen));
}

#[test]
fn the_timeline_records_tool_detection_before_argument_commits() {
	let reg = registry();
	let mut v = StreamingValidator::new(&reg);
	v.push_token("{action=\"search\" ");
	let result = v.push_token("query=\"hi\"}");

	let tool_detected_idx = result.timeline.iter().position(|e| matches!(e, glyph::validator::TimelineEvent::ToolDetected { .. }));
	let arg_committed_idx = result.timeline.iter().position(|e| matches!(e, glyph::validator::TimelineEvent::ArgCommitted { .. }));
	assert!(tool_detected_idx.is_some());
	assert!(arg_committed_idx.is_some());
	assert!(tool_detected_idx < arg_committed_idx);
}
