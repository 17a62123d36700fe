//! Header directive parsing (spec §4.4 "v2 header & mode detection", §4.7
//! "textual form", §6 "Header directives").
//!
//! Directives are scanned directly over the source text rather than
//! through the token stream: a schema hash, content id, or base
//! fingerprint is an opaque hex/base32 run that may start with a digit,
//! and folding that through the same lexer used for values would make
//! ordinary number lexing ambiguous for no benefit.
//!
//! Grammar (spec §4.4): `@(lyph|glyph) <version> [@schema#<id>]
//! [@mode=<mode>] [@keys=<mode>] [@target=<ref>] [@base=<fp>]`. The
//! single-word shorthands `@struct`, `@packed`, `@tab`, `@patch` set the
//! mode directly without an explicit `@lyph`/`@mode=` pair — `@tab` and
//! `@patch` in particular double as the opening token of their own block
//! forms (spec §4.6, §4.7), so once one of them is seen the remainder of
//! the line (the type name / `@schema#…` chain that follows) is handed
//! back as part of the body rather than consumed as more header words.

use crate::value::RefId;

/// Which body encoding a document's header selects (spec §4.4 `Mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Auto,
	Struct,
	Packed,
	Tabular,
	Patch,
}

/// Which key representation a v2 document's header selects for column
/// headers and patch paths (spec §4.4, §4.7 `@keys=<wire|name|fid>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
	Wire,
	Name,
	Fid,
}

/// The directives found before the first value, plus (via [`parse_header`]'s
/// return) the byte offset in the original source where the value body
/// begins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
	pub version: Option<String>,
	pub mode: Option<Mode>,
	pub keys: Option<KeyMode>,
	pub schema_id: Option<String>,
	pub target: Option<RefId>,
	pub base_fingerprint: Option<String>,
}

fn directive_word(s: &str) -> (&str, &str) {
	let len = s.find(|c: char| !c.is_ascii_alphanumeric() && c != '_').unwrap_or(s.len());
	s.split_at(len)
}

/// Consume a `#<arg>` run (used by `@schema#<id>`), stopping at whitespace.
fn hash_arg(s: &str) -> (Option<&str>, &str) {
	match s.strip_prefix('#') {
		Some(rest) => {
			let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
			let (arg, rest) = rest.split_at(len);
			(Some(arg), rest)
		}
		None => (None, s),
	}
}

/// Consume a `=<value>` run (used by `@mode=`, `@keys=`, `@target=`,
/// `@base=`), stopping at whitespace.
fn eq_arg(s: &str) -> (Option<&str>, &str) {
	match s.strip_prefix('=') {
		Some(rest) => {
			let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
			let (arg, rest) = rest.split_at(len);
			(Some(arg), rest)
		}
		None => (None, s),
	}
}

fn parse_mode(s: &str) -> Option<Mode> {
	match s {
		"auto" => Some(Mode::Auto),
		"struct" => Some(Mode::Struct),
		"packed" => Some(Mode::Packed),
		"tabular" => Some(Mode::Tabular),
		"patch" => Some(Mode::Patch),
		_ => None,
	}
}

fn parse_keys(s: &str) -> Option<KeyMode> {
	match s {
		"wire" => Some(KeyMode::Wire),
		"name" => Some(KeyMode::Name),
		"fid" => Some(KeyMode::Fid),
		_ => None,
	}
}

fn parse_ref(s: &str) -> RefId {
	match s.split_once(':') {
		Some((prefix, value)) => RefId { prefix: Some(prefix.to_string()), value: value.to_string() },
		None => RefId { prefix: None, value: s.to_string() },
	}
}

/// Consume `@directive[#arg|=arg]` runs at the front of `src`, returning the
/// parsed header and the remainder of the source (the value body, or — for
/// `@tab`/`@patch` — the block body starting right after the shorthand
/// word).
pub fn parse_header(src: &str) -> (Header, &str) {
	let mut header = Header::default();
	let mut rest = src.trim_start();
	loop {
		let Some(after_at) = rest.strip_prefix('@') else { break };
		let (word, after_word) = directive_word(after_at);
		if word.is_empty() {
			break;
		}
		match word {
			"lyph" | "glyph" => {
				let trimmed = after_word.trim_start();
				let (version, after_version) = directive_word(trimmed);
				header.version = Some(version.to_string());
				rest = after_version.trim_start();
			}
			"mode" => {
				let (arg, after) = eq_arg(after_word);
				header.mode = arg.and_then(parse_mode);
				rest = after.trim_start();
			}
			"keys" => {
				let (arg, after) = eq_arg(after_word);
				header.keys = arg.and_then(parse_keys);
				rest = after.trim_start();
			}
			"schema" => {
				let (arg, after) = hash_arg(after_word);
				header.schema_id = arg.map(str::to_string);
				rest = after.trim_start();
			}
			"target" => {
				let (arg, after) = eq_arg(after_word);
				header.target = arg.map(parse_ref);
				rest = after.trim_start();
			}
			"base" => {
				let (arg, after) = eq_arg(after_word);
				header.base_fingerprint = arg.map(str::to_string);
				rest = after.trim_start();
			}
			"struct" => {
				header.mode = Some(Mode::Struct);
				rest = after_word.trim_start();
			}
			"packed" => {
				header.mode = Some(Mode::Packed);
				rest = after_word.trim_start();
			}
			// `@tab`/`@patch` are themselves the opening token of their
			// block body (spec §4.6, §4.7): stop scanning and hand back
			// whatever follows (the type name, or more `@schema#…` etc.)
			// unconsumed.
			"tab" => {
				header.mode = Some(Mode::Tabular);
				rest = after_word.trim_start();
				break;
			}
			"patch" => {
				header.mode = Some(Mode::Patch);
				rest = after_word.trim_start();
				break;
			}
			_ => break,
		}
	}
	(header, rest)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_header_returns_source_unchanged() {
		let (header, body) = parse_header("{x:1}");
		assert_eq!(header, Header::default());
		assert_eq!(body, "{x:1}");
	}

	#[test]
	fn full_lyph_v2_header() {
		let (header, body) = parse_header(
			"@lyph v2 @schema#abc123ef @mode=packed @keys=fid @target=t:1 @base=0011223344556677 Team@(ARS)",
		);
		assert_eq!(header.version.as_deref(), Some("v2"));
		assert_eq!(header.schema_id.as_deref(), Some("abc123ef"));
		assert_eq!(header.mode, Some(Mode::Packed));
		assert_eq!(header.keys, Some(KeyMode::Fid));
		assert_eq!(header.target, Some(RefId { prefix: Some("t".into()), value: "1".into() }));
		assert_eq!(header.base_fingerprint.as_deref(), Some("0011223344556677"));
		assert_eq!(body, "Team@(ARS)");
	}

	#[test]
	fn tab_shorthand_stops_header_scanning_at_the_type_name() {
		let (header, body) = parse_header("@tab Hike [i n d e c s]\n1 a 2 b 3 c\n@end");
		assert_eq!(header.mode, Some(Mode::Tabular));
		assert_eq!(body, "Hike [i n d e c s]\n1 a 2 b 3 c\n@end");
	}

	#[test]
	fn patch_shorthand_with_header_directives() {
		let (header, body) = parse_header("@patch @schema#abc @keys=name @target=m:1 @base=fp\nscore=5\n@end");
		assert_eq!(header.mode, Some(Mode::Patch));
		assert_eq!(body, "@schema#abc @keys=name @target=m:1 @base=fp\nscore=5\n@end");
	}

	#[test]
	fn bare_struct_body_has_no_header() {
		let (header, body) = parse_header("Team{x:1}");
		assert_eq!(header, Header::default());
		assert_eq!(body, "Team{x:1}");
	}
}
