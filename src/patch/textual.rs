//! The textual wire form of a patch (spec §4.7 "Textual form", §6): one
//! `@patch` header naming the schema, key mode, target, and optional base
//! fingerprint, followed by one operation per line —
//! `= path value` (set), `+ path value [@idx=n]` (append), `- path`
//! (delete), `~ path value` (delta) — closed by `@end`.

use super::{Op, OpKind, Patch, Path, Seg};
use crate::emit::{self, EmitOptions};
use crate::error::{GlyphError, GlyphErrorKind};
use crate::lexer::{Lexer, TokenStream};
use crate::parser::directives::{self, KeyMode, Mode};
use crate::parser::value_parser::parse_value;
use crate::schema::Schema;
use crate::value::{RefId, Value};

fn flush_segment(current: &mut String, segs: &mut Vec<Seg>) {
	if current.is_empty() {
		return;
	}
	if let Some(fid_str) = current.strip_prefix('#') {
		if let Ok(fid) = fid_str.parse::<u32>() {
			segs.push(Seg::fid(fid));
		}
	} else {
		segs.push(Seg::field(current.clone()));
	}
	current.clear();
}

/// Parse a path spec such as `home.lineup[2].name` or `home.#7` (spec §4.7
/// "Paths"): dot-joined field segments, either a bare name or a `#<fid>`
/// stable-id reference, with optional bracketed list indices. Mixed
/// FID/name segments within one path are accepted, matching spec §4.7's
/// "mixed FID+name in one path is allowed".
fn parse_path_spec(s: &str) -> Path {
	let mut segs = Vec::new();
	let mut current = String::new();
	let mut chars = s.chars().peekable();
	while let Some(&c) = chars.peek() {
		match c {
			'.' => {
				flush_segment(&mut current, &mut segs);
				chars.next();
			}
			'[' => {
				flush_segment(&mut current, &mut segs);
				chars.next();
				let mut digits = String::new();
				while let Some(&d) = chars.peek() {
					if d == ']' {
						break;
					}
					digits.push(d);
					chars.next();
				}
				chars.next(); // ']'
				if let Ok(idx) = digits.parse::<usize>() {
					segs.push(Seg::Index(idx));
				}
			}
			_ => {
				current.push(c);
				chars.next();
			}
		}
	}
	flush_segment(&mut current, &mut segs);
	Path(segs)
}

fn parse_inline_value(s: &str) -> Result<Value, GlyphError> {
	let tokens = Lexer::new(s).tokenize();
	let mut ts = TokenStream::new(&tokens);
	let mut diagnostics = Vec::new();
	let value = parse_value(&mut ts, &mut diagnostics);
	match diagnostics.into_iter().next() {
		Some(d) => Err(d.into()),
		None => Ok(value),
	}
}

fn bad_line(line: &str) -> GlyphError {
	GlyphError::new(GlyphErrorKind::BadPath, format!("malformed patch line: {line:?}"))
}

/// Pulls a trailing `@idx=<n>` out of `s`, returning the text before it
/// (the value, or empty) and the parsed index.
fn extract_idx(s: &str) -> (&str, Option<usize>) {
	match s.find("@idx=") {
		Some(pos) => {
			let before = s[..pos].trim_end();
			let after = &s[pos + "@idx=".len()..];
			let len = after.find(char::is_whitespace).unwrap_or(after.len());
			(before, after[..len].parse::<usize>().ok())
		}
		None => (s, None),
	}
}

/// Parse one operation line. Operation characters outside `{=, +, -, ~}`
/// are a fatal diagnostic — patch parsing is never tolerant the way value
/// parsing is, because a corrupted patch must not partially apply
/// (SPEC_FULL.md §12.4).
fn parse_op_line(line: &str) -> Result<Op, GlyphError> {
	let mut chars = line.chars();
	let opchar = chars.next().ok_or_else(|| bad_line(line))?;
	let kind = match opchar {
		'=' => OpKind::Set,
		'+' => OpKind::Append,
		'-' => OpKind::Delete,
		'~' => OpKind::Delta,
		other => {
			return Err(GlyphError::new(
				GlyphErrorKind::UnexpectedToken,
				format!("unknown patch operation character {other:?}"),
			))
		}
	};
	let rest = line[opchar.len_utf8()..].trim_start();
	let path_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
	let (path_str, remainder) = rest.split_at(path_len);
	if path_str.is_empty() {
		return Err(bad_line(line));
	}
	let path = parse_path_spec(path_str);

	if kind == OpKind::Delete {
		return Ok(Op { kind, path, index: None, value: None });
	}

	let (value_str, index) = extract_idx(remainder.trim());
	let value_str = value_str.trim();
	if value_str.is_empty() {
		return Err(bad_line(line));
	}
	Ok(Op { kind, path, index, value: Some(parse_inline_value(value_str)?) })
}

fn format_ref(r: &RefId) -> String {
	match &r.prefix {
		Some(prefix) => format!("{prefix}:{}", r.value),
		None => r.value.clone(),
	}
}

fn key_mode_str(mode: KeyMode) -> &'static str {
	match mode {
		KeyMode::Wire => "wire",
		KeyMode::Name => "name",
		KeyMode::Fid => "fid",
	}
}

/// Render `path` under `key_mode`, resolving each field segment against
/// `schema`/`root_type` when given so `Wire` mode can substitute a field's
/// wire key and `Fid` mode can substitute a bare name's FID. Without a
/// schema, `Wire` falls back to the segment's name (there is nothing to
/// resolve a wire key from).
fn render_path(path: &Path, key_mode: KeyMode, schema: Option<&Schema>, root_type: Option<&str>) -> String {
	use crate::schema::FieldType;

	let mut current_ty = root_type.map(|t| FieldType::Struct(t.to_string()));
	let mut out = String::new();
	let mut first = true;
	for seg in &path.0 {
		match seg {
			Seg::Index(i) => {
				out.push_str(&format!("[{i}]"));
				if let Some(FieldType::List(inner)) = &current_ty {
					current_ty = Some((**inner).clone());
				}
			}
			Seg::Field { name, fid } => {
				let field = schema.zip(current_ty.as_ref()).and_then(|(schema, ty)| {
					let type_name = ty.named_type()?;
					let def = schema.get(type_name)?.as_struct()?;
					if *fid != 0 {
						def.field_by_fid(*fid)
					} else {
						def.field_by_key(name)
					}
				});
				let rendered = match (key_mode, field) {
					(KeyMode::Fid, Some(f)) if f.fid != 0 => format!("#{}", f.fid),
					(KeyMode::Fid, None) if *fid != 0 => format!("#{fid}"),
					(KeyMode::Wire, Some(f)) => f.wire_key.clone().unwrap_or_else(|| f.name.clone()),
					(_, Some(f)) => f.name.clone(),
					_ if !name.is_empty() => name.clone(),
					_ => format!("#{fid}"),
				};
				if !first {
					out.push('.');
				}
				out.push_str(&rendered);
				current_ty = field.map(|f| f.ty.clone());
			}
		}
		first = false;
	}
	out
}

fn emit_line(op: &Op, key_mode: KeyMode, schema: Option<&Schema>, root_type: Option<&str>) -> Result<String, GlyphError> {
	let path_str = render_path(&op.path, key_mode, schema, root_type);
	let render_value = |v: &Value| emit::emit(v, schema, &EmitOptions::canonical_hash_options());
	match op.kind {
		OpKind::Delete => Ok(format!("- {path_str}")),
		OpKind::Set => {
			let value = op.value.as_ref().ok_or_else(|| GlyphError::new(GlyphErrorKind::BadPath, "Set op is missing its value"))?;
			Ok(format!("= {path_str} {}", render_value(value)?))
		}
		OpKind::Append => {
			let value =
				op.value.as_ref().ok_or_else(|| GlyphError::new(GlyphErrorKind::BadPath, "Append op is missing its value"))?;
			let mut line = format!("+ {path_str} {}", render_value(value)?);
			if let Some(idx) = op.index {
				line.push_str(&format!(" @idx={idx}"));
			}
			Ok(line)
		}
		OpKind::Delta => {
			let value = op.value.as_ref().ok_or_else(|| GlyphError::new(GlyphErrorKind::BadPath, "Delta op is missing its value"))?;
			Ok(format!("~ {path_str} {}", render_value(value)?))
		}
	}
}

/// Serialize `patch` in the textual patch form (spec §4.7). `schema` is
/// used, when given along with `patch.target_type`, to render `Wire`/`Fid`
/// key modes; without it, paths render their segments' own names/FIDs
/// verbatim.
pub fn emit_patch(patch: &Patch, key_mode: KeyMode, schema: Option<&Schema>) -> Result<String, GlyphError> {
	let mut out = format!("@patch @schema#{} @keys={}", patch.schema_id, key_mode_str(key_mode));
	out.push_str(&format!(" @target={}", format_ref(&patch.target)));
	if let Some(fp) = &patch.base_fingerprint {
		out.push_str(&format!(" @base={fp}"));
	}
	out.push('\n');
	for op in &patch.ops {
		out.push_str(&emit_line(op, key_mode, schema, patch.target_type.as_deref())?);
		out.push('\n');
	}
	out.push_str("@end");
	Ok(out)
}

/// Parse the textual patch form into a [`Patch`]. `@schema#<id>` and
/// `@target=<ref>` are required; `@base=<fp>` is optional.
pub fn parse_patch(src: &str) -> Result<Patch, GlyphError> {
	let (header, body) = directives::parse_header(src);
	if header.mode != Some(Mode::Patch) {
		return Err(GlyphError::new(GlyphErrorKind::UnexpectedToken, "expected a @patch document"));
	}
	// `@patch` itself stops header scanning (it doubles as the block's
	// opening token, spec §4.7), so the schema/keys/target/base directives
	// that follow on the same logical line are still unconsumed in `body`.
	let (header, body) = directives::parse_header(body);
	let schema_id = header
		.schema_id
		.ok_or_else(|| GlyphError::new(GlyphErrorKind::BadPath, "patch is missing @schema#<id>"))?;
	let target = header.target.ok_or_else(|| GlyphError::new(GlyphErrorKind::BadPath, "patch is missing @target=<ref>"))?;

	let mut ops = Vec::new();
	for line in body.lines() {
		let line = line.trim();
		if line.is_empty() || line == "@end" {
			continue;
		}
		ops.push(parse_op_line(line)?);
	}

	let mut patch = Patch::new(target, schema_id, ops);
	patch.base_fingerprint = header.base_fingerprint;
	Ok(patch)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_patch() -> Patch {
		Patch::new(
			RefId { prefix: Some("m".into()), value: "1".into() },
			"abc123ef",
			vec![
				Op::set(Path::root().push_key("name"), Value::str("Arsenal")),
				Op::delta(Path::root().push_key("xH"), 0.18),
				Op::delete(Path::root().push_key("stale")),
			],
		)
	}

	#[test]
	fn round_trips_a_mixed_op_list() {
		let patch = sample_patch();
		let text = emit_patch(&patch, KeyMode::Name, None).unwrap();
		assert!(text.starts_with("@patch @schema#abc123ef @keys=name @target=m:1\n"));
		assert!(text.trim_end().ends_with("@end"));

		let parsed = parse_patch(&text).unwrap();
		assert_eq!(parsed, patch);
	}

	#[test]
	fn append_line_carries_its_index() {
		let patch = Patch::new(
			RefId { prefix: None, value: "1".into() },
			"s",
			vec![Op::append(Path::root().push_key("items"), Value::int(9), Some(1))],
		);
		let text = emit_patch(&patch, KeyMode::Name, None).unwrap();
		assert!(text.contains("+ items 9 @idx=1"));
		let parsed = parse_patch(&text).unwrap();
		assert_eq!(parsed, patch);
	}

	#[test]
	fn base_fingerprint_round_trips_through_the_header() {
		let patch = sample_patch().with_base_fingerprint("0011223344556677");
		let text = emit_patch(&patch, KeyMode::Name, None).unwrap();
		assert!(text.contains("@base=0011223344556677"));
		let parsed = parse_patch(&text).unwrap();
		assert_eq!(parsed.base_fingerprint.as_deref(), Some("0011223344556677"));
	}

	#[test]
	fn fid_path_parses_and_renders() {
		let path = parse_path_spec("home.#7.lineup[2]");
		assert_eq!(
			path.0,
			vec![
				Seg::field("home"),
				Seg::fid(7),
				Seg::field("lineup"),
				Seg::Index(2),
			]
		);
	}

	#[test]
	fn unknown_operation_character_is_fatal() {
		let err = parse_op_line("? score 5").unwrap_err();
		assert_eq!(*err.kind(), GlyphErrorKind::UnexpectedToken);
	}

	#[test]
	fn delete_line_has_no_value() {
		let op = parse_op_line("- stale").unwrap();
		assert_eq!(op.kind, OpKind::Delete);
		assert!(op.value.is_none());
	}
}
