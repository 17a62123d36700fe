//! Recursive-descent value grammar (spec §4.2 "Tolerant parser", §6
//! grammar).
//!
//! Parses structurally, without consulting a schema: a name immediately
//! followed by `{...}` always becomes a [`StructValue`] here, whether it
//! turns out to name a struct or a sum-with-struct-payload once checked
//! against a schema. Disambiguating the two is the schema-aware layer's
//! job (spec §9 "schema as shared ownership"), not this one's.
//!
//! Never aborts: a malformed token is recorded as a [`Diagnostic`] and
//! folded to `Null`, and the parser keeps going from there (spec §4.2).

use chrono::{DateTime, Utc};

use crate::error::{Diagnostic, GlyphErrorKind};
use crate::lexer::{TokenKind, TokenStream};
use crate::value::{Blob, Cid, PoolRef, Value, ValueKind};

pub fn parse_value(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>) -> Value {
	let pos = ts.current_position();
	match ts.peek().kind {
		TokenKind::Null => {
			ts.advance();
			Value::null().with_position(pos)
		}
		TokenKind::True => {
			ts.advance();
			Value::bool(true).with_position(pos)
		}
		TokenKind::False => {
			ts.advance();
			Value::bool(false).with_position(pos)
		}
		TokenKind::Int => {
			let lexeme = ts.advance().lexeme.clone();
			match lexeme.parse::<i64>() {
				Ok(n) => Value::int(n).with_position(pos),
				Err(_) => {
					diagnostics.push(Diagnostic::at(GlyphErrorKind::InvalidNumber, format!("invalid integer literal {lexeme:?}"), pos));
					Value::null().with_position(pos)
				}
			}
		}
		TokenKind::Float => {
			let lexeme = ts.advance().lexeme.clone();
			match lexeme.parse::<f64>() {
				Ok(f) => Value::float(f).with_position(pos),
				Err(_) => {
					diagnostics.push(Diagnostic::at(GlyphErrorKind::InvalidNumber, format!("invalid float literal {lexeme:?}"), pos));
					Value::null().with_position(pos)
				}
			}
		}
		TokenKind::String | TokenKind::BareStr => {
			let s = ts.advance().lexeme.clone();
			Value::str(s).with_position(pos)
		}
		TokenKind::Ref => {
			let lexeme = ts.advance().lexeme.clone();
			let (prefix, value) = match lexeme.split_once(':') {
				Some((p, v)) => (Some(p.to_string()), v.to_string()),
				None => (None, lexeme),
			};
			Value::reference(prefix, value).with_position(pos)
		}
		TokenKind::Time => {
			let lexeme = ts.advance().lexeme.clone();
			parse_time(&lexeme, pos, diagnostics)
		}
		TokenKind::LBracket => parse_list(ts, diagnostics, pos),
		TokenKind::LBrace => parse_map(ts, diagnostics, pos),
		TokenKind::At => parse_at_form(ts, diagnostics, pos),
		TokenKind::Ident => parse_ident_led(ts, diagnostics, pos),
		_ => {
			let tok = ts.advance().clone();
			diagnostics.push(Diagnostic::at(
				GlyphErrorKind::UnexpectedToken,
				format!("unexpected token {:?} ({:?})", tok.kind, tok.lexeme),
				pos,
			));
			Value::null().with_position(pos)
		}
	}
}

fn parse_time(lexeme: &str, pos: crate::lexer::Position, diagnostics: &mut Vec<Diagnostic>) -> Value {
	let normalized = if lexeme.ends_with('Z') {
		format!("{}{}", &lexeme[..lexeme.len() - 1], "+00:00")
	} else {
		lexeme.to_string()
	};
	match DateTime::parse_from_rfc3339(&normalized) {
		Ok(dt) => Value::time(dt.with_timezone(&Utc)).with_position(pos),
		Err(_) => {
			diagnostics.push(Diagnostic::at(GlyphErrorKind::InvalidTimestamp, format!("invalid timestamp {lexeme:?}"), pos));
			Value::null().with_position(pos)
		}
	}
}

fn parse_key(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>) -> String {
	match ts.peek().kind {
		TokenKind::Ident | TokenKind::String | TokenKind::BareStr => ts.advance().lexeme.clone(),
		TokenKind::True => {
			ts.advance();
			"t".to_string()
		}
		TokenKind::False => {
			ts.advance();
			"f".to_string()
		}
		TokenKind::Null => {
			ts.advance();
			"null".to_string()
		}
		TokenKind::Hash => {
			ts.advance();
			let idx_tok = ts.advance().clone();
			format!("#{}", idx_tok.lexeme)
		}
		_ => {
			let tok = ts.advance().clone();
			diagnostics.push(Diagnostic::at(
				GlyphErrorKind::UnexpectedToken,
				format!("expected a key, found {:?}", tok.kind),
				tok.position,
			));
			String::new()
		}
	}
}

fn parse_list(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>, pos: crate::lexer::Position) -> Value {
	ts.advance(); // '['
	let mut items = Vec::new();
	while !ts.is_eof() && ts.peek().kind != TokenKind::RBracket {
		items.push(parse_value(ts, diagnostics));
	}
	if !ts.matches(TokenKind::RBracket) {
		diagnostics.push(Diagnostic::at(GlyphErrorKind::UnclosedContainer, "unclosed list", pos));
	}
	Value::list(items).with_position(pos)
}

fn parse_map(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>, pos: crate::lexer::Position) -> Value {
	ts.advance(); // '{'
	let mut entries = Vec::new();
	while !ts.is_eof() && ts.peek().kind != TokenKind::RBrace {
		let key = parse_key(ts, diagnostics);
		if !ts.matches(TokenKind::Eq) {
			diagnostics.push(Diagnostic::at(GlyphErrorKind::UnexpectedToken, "expected ':' or '=' after a map key", ts.current_position()));
		}
		let value = parse_value(ts, diagnostics);
		entries.push((key, value));
	}
	if !ts.matches(TokenKind::RBrace) {
		diagnostics.push(Diagnostic::at(GlyphErrorKind::UnclosedContainer, "unclosed map", pos));
	}
	Value::map(entries).with_position(pos)
}

fn parse_ident_led(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>, pos: crate::lexer::Position) -> Value {
	let name = ts.advance().lexeme.clone();
	match ts.peek().kind {
		TokenKind::LBrace => {
			ts.advance();
			let mut fields = Vec::new();
			while !ts.is_eof() && ts.peek().kind != TokenKind::RBrace {
				let key = parse_key(ts, diagnostics);
				if !ts.matches(TokenKind::Eq) {
					diagnostics.push(Diagnostic::at(GlyphErrorKind::UnexpectedToken, "expected '=' after a field name", ts.current_position()));
				}
				let value = parse_value(ts, diagnostics);
				fields.push((key, value));
			}
			if !ts.matches(TokenKind::RBrace) {
				diagnostics.push(Diagnostic::at(GlyphErrorKind::UnclosedContainer, "unclosed struct", pos));
			}
			Value::strct(name, fields).with_position(pos)
		}
		TokenKind::LParen => {
			ts.advance();
			let inner = if ts.peek().kind == TokenKind::RParen {
				None
			} else {
				Some(parse_value(ts, diagnostics))
			};
			if !ts.matches(TokenKind::RParen) {
				diagnostics.push(Diagnostic::at(GlyphErrorKind::UnclosedContainer, "unclosed sum payload", pos));
			}
			Value::sum(name, inner).with_position(pos)
		}
		_ => Value::str(name).with_position(pos),
	}
}

fn parse_at_form(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>, pos: crate::lexer::Position) -> Value {
	ts.advance(); // '@'
	let word = match ts.peek().kind {
		TokenKind::Ident => ts.advance().lexeme.clone(),
		_ => {
			diagnostics.push(Diagnostic::at(GlyphErrorKind::UnexpectedToken, "expected a directive name after '@'", pos));
			return Value::null().with_position(pos);
		}
	};
	match word.as_str() {
		"pool" => {
			let name = match ts.peek().kind {
				TokenKind::String | TokenKind::Ident | TokenKind::BareStr => ts.advance().lexeme.clone(),
				_ => {
					diagnostics.push(Diagnostic::at(GlyphErrorKind::UnexpectedToken, "expected a pool handle", pos));
					String::new()
				}
			};
			Value::new(ValueKind::PoolRef(PoolRef(name))).with_position(pos)
		}
		"blob" => parse_blob_attrs(ts, diagnostics, pos),
		_ => {
			diagnostics.push(Diagnostic::at(GlyphErrorKind::UnexpectedToken, format!("unknown inline directive @{word}"), pos));
			Value::null().with_position(pos)
		}
	}
}

fn value_as_string(v: &Value) -> Option<String> {
	match &v.kind {
		ValueKind::Str(s) => Some(s.clone()),
		_ => None,
	}
}

/// `@blob cid=<algo>:<hex> mime=<mime> bytes=<n> [name=… caption=… preview=…]`
/// (spec §6 "blob reference format"). Carries metadata only — the bytes
/// themselves live in a [`crate::blob::BlobRegistry`], addressed by `cid`.
fn parse_blob_attrs(ts: &mut TokenStream<'_>, diagnostics: &mut Vec<Diagnostic>, pos: crate::lexer::Position) -> Value {
	let mut cid_text: Option<String> = None;
	let mut mime = None;
	let mut name = None;
	let mut caption = None;
	let mut preview = None;

	while ts.peek().kind == TokenKind::Ident && ts.peek_n(1).kind == TokenKind::Eq {
		let attr = ts.advance().lexeme.clone();
		ts.advance(); // '='
		match attr.as_str() {
			"cid" if ts.peek().kind == TokenKind::Ident && ts.peek_n(1).kind == TokenKind::Eq => {
				let algo = ts.advance().lexeme.clone();
				ts.advance(); // ':'
				let hex_tok = ts.advance().clone();
				cid_text = Some(format!("{algo}:{}", hex_tok.lexeme));
			}
			"cid" => {
				let value = parse_value(ts, diagnostics);
				cid_text = value_as_string(&value);
			}
			"mime" => mime = value_as_string(&parse_value(ts, diagnostics)),
			"name" => name = value_as_string(&parse_value(ts, diagnostics)),
			"caption" => caption = value_as_string(&parse_value(ts, diagnostics)),
			"preview" => preview = value_as_string(&parse_value(ts, diagnostics)),
			_ => {
				// Unknown attribute (e.g. the informational `bytes=<n>` hint):
				// parse and discard its value so the stream stays aligned.
				let _ = parse_value(ts, diagnostics);
			}
		}
	}

	let cid = match cid_text.as_deref().map(str::parse::<Cid>) {
		Some(Ok(cid)) => cid,
		_ => {
			diagnostics.push(Diagnostic::at(GlyphErrorKind::BadGlyphMarker, "blob reference is missing a valid cid", pos));
			Cid { algo: "sha256".to_string(), hex: String::new() }
		}
	};
	Value::new(ValueKind::Blob(Blob {
		cid,
		mime: mime.unwrap_or_default(),
		bytes: Vec::new(),
		name,
		caption,
		preview,
	}))
	.with_position(pos)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::Lexer;

	fn parse(src: &str) -> (Value, Vec<Diagnostic>) {
		let tokens = Lexer::new(src).tokenize();
		let mut ts = TokenStream::new(&tokens);
		let mut diagnostics = Vec::new();
		let value = parse_value(&mut ts, &mut diagnostics);
		(value, diagnostics)
	}

	#[test]
	fn scenario_a_round_trips_structurally() {
		let (v, diags) = parse("{home:{n:Arsenal t:ARS} id:m:ARS-LIV xH:1.72}");
		assert!(diags.is_empty());
		assert_eq!(v.get("xH"), Some(&Value::float(1.72)));
		let home = v.get("home").unwrap();
		assert_eq!(home.get("n"), Some(&Value::str("Arsenal")));
	}

	#[test]
	fn struct_and_sum_syntax() {
		let (v, diags) = parse("Team{name=Arsenal}");
		assert!(diags.is_empty());
		assert!(matches!(v.kind, ValueKind::Struct(_)));

		let (v, diags) = parse("Some(42)");
		assert!(diags.is_empty());
		assert!(matches!(v.kind, ValueKind::Sum(_)));

		let (v, _) = parse("None()");
		match v.kind {
			ValueKind::Sum(s) => assert!(s.value.is_none()),
			_ => panic!("expected a sum"),
		}
	}

	#[test]
	fn bare_ident_is_a_string() {
		let (v, diags) = parse("Arsenal");
		assert!(diags.is_empty());
		assert_eq!(v, Value::str("Arsenal"));
	}

	#[test]
	fn unclosed_list_is_a_diagnostic_not_a_panic() {
		let (_, diags) = parse("[1 2 3");
		assert_eq!(diags.len(), 1);
		assert_eq!(diags[0].kind, GlyphErrorKind::UnclosedContainer);
	}

	#[test]
	fn blob_reference_round_trips_metadata() {
		let (v, diags) = parse(r#"@blob cid=sha256:abc123 mime="image/png" bytes=4 name="photo.png""#);
		assert!(diags.is_empty());
		match v.kind {
			ValueKind::Blob(b) => {
				assert_eq!(b.cid.to_string(), "sha256:abc123");
				assert_eq!(b.mime, "image/png");
				assert_eq!(b.name.as_deref(), Some("photo.png"));
			}
			_ => panic!("expected a blob"),
		}
	}

	#[test]
	fn pool_reference() {
		let (v, diags) = parse(r#"@pool "p1""#);
		assert!(diags.is_empty());
		assert!(matches!(v.kind, ValueKind::PoolRef(_)));
	}
}
