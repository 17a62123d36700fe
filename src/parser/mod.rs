//! The tolerant parser (spec §4.2): text in, a [`Value`] tree and a list of
//! [`Diagnostic`]s out, never a panic and never an early abort on
//! malformed input.

pub mod directives;
pub(crate) mod value_parser;

pub use directives::{Header, Mode};
pub use value_parser::parse_value;

use crate::error::{Diagnostic, GlyphError, GlyphErrorKind};
use crate::lexer::{Lexer, TokenStream};
use crate::value::Value;

/// Parse `src`, collecting every recoverable issue instead of aborting on
/// the first one.
pub fn parse_tolerant(src: &str) -> (Header, Value, Vec<Diagnostic>) {
	let (header, body) = directives::parse_header(src);
	let tokens = Lexer::new(body).tokenize();
	let mut ts = TokenStream::new(&tokens);
	let mut diagnostics = Vec::new();
	if ts.is_eof() {
		diagnostics.push(Diagnostic::new(GlyphErrorKind::EmptyInput, "document has no value body"));
		return (header, Value::null(), diagnostics);
	}
	let value = value_parser::parse_value(&mut ts, &mut diagnostics);
	if !ts.is_eof() {
		diagnostics.push(Diagnostic::at(
			GlyphErrorKind::UnexpectedToken,
			format!("trailing input after the document's value: {:?}", ts.peek().lexeme),
			ts.current_position(),
		));
	}
	(header, value, diagnostics)
}

/// Parse `src`, turning the first diagnostic (if any) into a hard error.
pub fn parse_strict(src: &str) -> Result<(Header, Value), GlyphError> {
	let (header, value, diagnostics) = parse_tolerant(src);
	match diagnostics.into_iter().next() {
		Some(d) => Err(d.into()),
		None => Ok((header, value)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strict_parse_succeeds_on_well_formed_input() {
		let (header, value) = parse_strict("@packed Team {n:Arsenal}").unwrap();
		assert_eq!(header.mode, Some(Mode::Packed));
		assert_eq!(value.get("n"), Some(&Value::str("Arsenal")));
	}

	#[test]
	fn strict_parse_rejects_trailing_garbage() {
		assert!(parse_strict("1 2").is_err());
	}

	#[test]
	fn tolerant_parse_reports_empty_input() {
		let (_, _, diagnostics) = parse_tolerant("");
		assert_eq!(diagnostics.len(), 1);
		assert_eq!(diagnostics[0].kind, GlyphErrorKind::EmptyInput);
	}
}
