//! Incremental streaming validation of tool-call payloads against a
//! [`ToolRegistry`] (spec §4.8).
//!
//! A [`StreamingValidator`] is fed chunks of a payload as they arrive
//! (`push_token`) and tracks, across calls, which tool is being invoked,
//! whether it's an allowed one, and which committed arguments violate their
//! schema. An unknown tool is rejected the moment its name closes, without
//! waiting for the rest of the payload to arrive; a constraint violation on
//! an allowed tool's argument is reported without stopping the stream, so a
//! caller sees every problem with a call rather than only the first.

pub mod tool;

pub use tool::{ToolRegistry, ToolSchema};

use std::collections::HashSet;

use regex::Regex;

use crate::lexer::{Lexer, TokenStream};
use crate::parser::parse_value;
use crate::schema::{Constraints, FieldType};
use crate::value::{Value, ValueKind};

/// Where a [`StreamingValidator`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Idle,
	InPayload,
	ToolDetected,
	Validating,
	Complete,
	Rejected,
}

/// A distinct failure mode for a streamed tool call, separate from
/// [`crate::error::GlyphErrorKind`]: these accumulate as non-fatal
/// diagnostics over the life of a stream rather than aborting a single
/// parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
	UnknownTool,
	ConstraintMin,
	ConstraintMax,
	ConstraintLen,
	ConstraintPat,
	MissingRequired,
	TypeMismatch,
	ParseError,
}

/// One validation failure against a streamed argument (or the tool call as
/// a whole, when `arg` is `None`).
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
	pub code: ErrorCode,
	pub arg: Option<String>,
	pub message: String,
}

impl ValidationError {
	fn new(code: ErrorCode, arg: Option<String>, message: impl Into<String>) -> Self {
		Self { code, arg, message: message.into() }
	}
}

/// One event in the order the validator observed it, for callers that want
/// to show a call being assembled live rather than just its final verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
	Start,
	ToolDetected { name: String, token_idx: usize },
	ArgCommitted { name: String },
	ConstraintError { arg: Option<String>, code: ErrorCode },
	Complete,
	Rejected,
}

/// The validator's answer after each [`StreamingValidator::push_token`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamValidationResult {
	/// The payload has finished (closing brace seen) or been rejected early.
	pub complete: bool,
	/// `complete` and every committed arg satisfied its schema.
	pub valid: bool,
	pub tool_name: Option<String>,
	pub tool_allowed: bool,
	pub errors: Vec<ValidationError>,
	pub timeline: Vec<TimelineEvent>,
}

/// Matches `action="<name>"` in the accumulated buffer. Quote-delimited, so
/// a match only fires once the tool name itself has fully arrived.
fn tool_name_re() -> Regex {
	Regex::new(r#"action\s*=\s*"([^"]*)""#).expect("static pattern")
}

/// Matches a committed `key=value` pair: string values are delimited by
/// their closing quote; bare scalars (numbers, `true`/`false`/`null`) only
/// count as committed once followed by whitespace or a closing punctuator,
/// since a bare token could still be growing (spec §4.8 "committed only
/// when terminated by whitespace or a closing punctuator").
fn arg_re() -> Regex {
	Regex::new(r#"(\w+)\s*=\s*("(?:[^"\\]|\\.)*"|-?[0-9]+(?:\.[0-9]+)?|true|false|null)(?=[\s,}])"#)
		.expect("static pattern")
}

/// Whether the buffer's brace nesting (ignoring braces inside quoted
/// strings) has returned to zero after having opened at least once — i.e.
/// the payload's closing `}` has arrived.
fn is_payload_closed(buffer: &str) -> bool {
	let mut depth: i32 = 0;
	let mut saw_open = false;
	let mut in_string = false;
	let mut escaped = false;
	for c in buffer.chars() {
		if in_string {
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == '"' {
				in_string = false;
			}
			continue;
		}
		match c {
			'"' => in_string = true,
			'{' => {
				depth += 1;
				saw_open = true;
			}
			'}' => depth -= 1,
			_ => {}
		}
	}
	saw_open && depth <= 0
}

fn type_matches(ty: &FieldType, kind: &ValueKind) -> bool {
	matches!(
		(ty, kind),
		(FieldType::Null, ValueKind::Null)
			| (FieldType::Bool, ValueKind::Bool(_))
			| (FieldType::Int, ValueKind::Int(_))
			| (FieldType::Float, ValueKind::Float(_) | ValueKind::Int(_))
			| (FieldType::Str, ValueKind::Str(_))
			| (FieldType::Any, _)
	)
}

/// Checks a single committed value against its field's constraints,
/// returning one [`ValidationError`] per violation — a value can fail more
/// than one constraint at once (e.g. both too long and pattern-mismatched).
fn check_constraints(name: &str, constraints: &Constraints, value: &Value) -> Vec<ValidationError> {
	let mut errors = Vec::new();
	let numeric = match &value.kind {
		ValueKind::Int(n) => Some(*n as f64),
		ValueKind::Float(f) => Some(*f),
		_ => None,
	};
	if let Some(n) = numeric {
		if let Some(min) = constraints.min {
			if n < min {
				errors.push(ValidationError::new(
					ErrorCode::ConstraintMin,
					Some(name.to_string()),
					format!("{name} = {n} is below minimum {min}"),
				));
			}
		}
		if let Some(max) = constraints.max {
			if n > max {
				errors.push(ValidationError::new(
					ErrorCode::ConstraintMax,
					Some(name.to_string()),
					format!("{name} = {n} is above maximum {max}"),
				));
			}
		}
	}
	if let ValueKind::Str(s) = &value.kind {
		let len = s.chars().count();
		if let Some(min_len) = constraints.min_len {
			if len < min_len {
				errors.push(ValidationError::new(
					ErrorCode::ConstraintLen,
					Some(name.to_string()),
					format!("{name} is shorter than minimum length {min_len}"),
				));
			}
		}
		if let Some(max_len) = constraints.max_len {
			if len > max_len {
				errors.push(ValidationError::new(
					ErrorCode::ConstraintLen,
					Some(name.to_string()),
					format!("{name} is longer than maximum length {max_len}"),
				));
			}
		}
		if let Some(pattern) = &constraints.pattern {
			match Regex::new(pattern) {
				Ok(re) if !re.is_match(s) => errors.push(ValidationError::new(
					ErrorCode::ConstraintPat,
					Some(name.to_string()),
					format!("{name} does not match pattern {pattern:?}"),
				)),
				Ok(_) => {}
				Err(_) => errors.push(ValidationError::new(
					ErrorCode::ConstraintPat,
					Some(name.to_string()),
					format!("invalid pattern {pattern:?} on field {name}"),
				)),
			}
		}
	}
	errors
}

/// Incrementally validates a single tool call's streamed payload against a
/// [`ToolRegistry`]. See the module docs for the overall lifecycle.
pub struct StreamingValidator<'r> {
	registry: &'r ToolRegistry,
	state: State,
	buffer: String,
	token_idx: usize,
	tool_name: Option<String>,
	tool_allowed: bool,
	committed: HashSet<String>,
	errors: Vec<ValidationError>,
	timeline: Vec<TimelineEvent>,
	stop: bool,
}

impl<'r> StreamingValidator<'r> {
	pub fn new(registry: &'r ToolRegistry) -> Self {
		Self {
			registry,
			state: State::Idle,
			buffer: String::new(),
			token_idx: 0,
			tool_name: None,
			tool_allowed: false,
			committed: HashSet::new(),
			errors: Vec::new(),
			timeline: Vec::new(),
			stop: false,
		}
	}

	/// Feed the next chunk of the payload. Chunks may split UTF-8 boundaries,
	/// tokens, or even a quoted string in half; the validator tolerates this
	/// by only acting on text that has fully arrived (see [`arg_re`]).
	pub fn push_token(&mut self, chunk: &str) -> StreamValidationResult {
		if self.state == State::Idle {
			self.state = State::InPayload;
			self.timeline.push(TimelineEvent::Start);
		}
		self.buffer.push_str(chunk);
		self.token_idx += 1;

		if !self.stop && self.tool_name.is_none() {
			self.detect_tool();
		}
		if !self.stop && self.tool_name.is_some() {
			self.collect_args();
		}
		if !self.stop {
			self.try_finish();
		}
		self.result()
	}

	/// Whether the caller should stop sending further chunks: the tool was
	/// rejected outright, or the payload has already completed.
	pub fn should_stop(&self) -> bool {
		self.stop || matches!(self.state, State::Complete | State::Rejected)
	}

	fn detect_tool(&mut self) {
		let Some(caps) = tool_name_re().captures(&self.buffer) else { return };
		let name = caps[1].to_string();
		self.state = State::ToolDetected;
		self.timeline.push(TimelineEvent::ToolDetected { name: name.clone(), token_idx: self.token_idx });
		self.tool_name = Some(name.clone());
		self.committed.insert("action".to_string());

		match self.registry.get(&name) {
			Some(_) => {
				self.tool_allowed = true;
				self.state = State::Validating;
			}
			None => {
				self.tool_allowed = false;
				self.push_error(ValidationError::new(ErrorCode::UnknownTool, None, format!("unknown tool {name:?}")));
				self.state = State::Rejected;
				self.stop = true;
				self.timeline.push(TimelineEvent::Rejected);
			}
		}
	}

	fn collect_args(&mut self) {
		if !self.tool_allowed {
			return;
		}
		let Some(tool_name) = self.tool_name.clone() else { return };
		let Some(tool) = self.registry.get(&tool_name) else { return };

		let matches: Vec<(String, String)> =
			arg_re().captures_iter(&self.buffer).map(|c| (c[1].to_string(), c[2].to_string())).collect();

		for (name, raw) in matches {
			if self.committed.contains(&name) {
				continue;
			}
			self.committed.insert(name.clone());
			self.timeline.push(TimelineEvent::ArgCommitted { name: name.clone() });

			let Some(field) = tool.arg(&name) else { continue };
			match parse_scalar(&raw) {
				Ok(value) => {
					if !type_matches(&field.ty, &value.kind) {
						self.push_error(ValidationError::new(
							ErrorCode::TypeMismatch,
							Some(name.clone()),
							format!("{name} does not match its declared type"),
						));
						continue;
					}
					let violations = check_constraints(&name, &field.constraints, &value);
					for err in violations {
						self.push_error(err);
					}
				}
				Err(_) => self.push_error(ValidationError::new(
					ErrorCode::ParseError,
					Some(name.clone()),
					format!("could not parse value for {name}"),
				)),
			}
		}
	}

	fn push_error(&mut self, err: ValidationError) {
		self.timeline.push(TimelineEvent::ConstraintError { arg: err.arg.clone(), code: err.code });
		self.errors.push(err);
	}

	fn try_finish(&mut self) {
		if self.state != State::Validating || !is_payload_closed(&self.buffer) {
			return;
		}
		let Some(tool_name) = self.tool_name.clone() else { return };
		if let Some(tool) = self.registry.get(&tool_name) {
			for field in &tool.args {
				if !field.optional && !self.committed.contains(&field.name) {
					self.push_error(ValidationError::new(
						ErrorCode::MissingRequired,
						Some(field.name.clone()),
						format!("missing required argument {}", field.name),
					));
				}
			}
		}
		self.state = State::Complete;
		self.timeline.push(TimelineEvent::Complete);
	}

	fn result(&self) -> StreamValidationResult {
		let complete = matches!(self.state, State::Complete | State::Rejected);
		StreamValidationResult {
			complete,
			valid: self.state == State::Complete && self.errors.is_empty(),
			tool_name: self.tool_name.clone(),
			tool_allowed: self.tool_allowed,
			errors: self.errors.clone(),
			timeline: self.timeline.clone(),
		}
	}
}

fn parse_scalar(raw: &str) -> Result<Value, crate::error::GlyphError> {
	let tokens = Lexer::new(raw).tokenize();
	let mut ts = TokenStream::new(&tokens);
	let mut diagnostics = Vec::new();
	let value = parse_value(&mut ts, &mut diagnostics);
	match diagnostics.into_iter().next() {
		Some(d) => Err(d.into()),
		None => Ok(value),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{Constraints, FieldDef, FieldType};

	fn registry() -> ToolRegistry {
		let mut reg = ToolRegistry::new();
		let limit = FieldDef {
			constraints: Constraints { max: Some(10.0), ..Default::default() },
			..FieldDef::new("limit", FieldType::Int).optional()
		};
		reg.register(ToolSchema::new("search", vec![FieldDef::new("query", FieldType::Str), limit]));
		reg
	}

	#[test]
	fn scenario_f_unknown_tool_is_rejected_as_soon_as_name_closes() {
		let reg = registry();
		let mut v = StreamingValidator::new(&reg);
		let r1 = v.push_token("{action=\"dan");
		assert!(!r1.complete);
		let r2 = v.push_token("ger\" ");
		assert_eq!(r2.tool_name.as_deref(), Some("danger"));
		assert!(!r2.tool_allowed);
		assert_eq!(r2.errors.len(), 1);
		assert_eq!(r2.errors[0].code, ErrorCode::UnknownTool);
		assert!(v.should_stop());
	}

	#[test]
	fn well_formed_call_completes_and_is_valid() {
		let reg = registry();
		let mut v = StreamingValidator::new(&reg);
		v.push_token("{action=\"search\" ");
		v.push_token("query=\"hello\" ");
		let r = v.push_token("limit=3}");
		assert!(r.complete);
		assert!(r.valid);
		assert!(r.errors.is_empty());
	}

	#[test]
	fn constraint_violation_is_reported_without_stopping_the_stream() {
		let reg = registry();
		let mut v = StreamingValidator::new(&reg);
		v.push_token("{action=\"search\" ");
		v.push_token("query=\"hello\" ");
		let r = v.push_token("limit=99}");
		assert!(r.complete);
		assert!(!r.valid);
		assert!(r.errors.iter().any(|e| e.code == ErrorCode::ConstraintMax));
	}

	#[test]
	fn missing_required_arg_is_reported_at_close() {
		let reg = registry();
		let mut v = StreamingValidator::new(&reg);
		v.push_token("{action=\"search\" ");
		let r = v.push_token("limit=3}");
		assert!(r.complete);
		assert!(!r.valid);
		assert!(r.errors.iter().any(|e| e.code == ErrorCode::MissingRequired && e.arg.as_deref() == Some("query")));
	}

	#[test]
	fn constraint_error_is_reported_exactly_once() {
		let reg = registry();
		let mut v = StreamingValidator::new(&reg);
		v.push_token("{action=\"search\" query=\"hello\" limit=99");
		let r = v.push_token("}");
		assert_eq!(r.errors.iter().filter(|e| e.code == ErrorCode::ConstraintMax).count(), 1);
	}
}
