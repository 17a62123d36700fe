//! Stream-to-token conversion over UTF-8 GLYPH-T source (spec §4.1)

mod token_stream;

pub use token_stream::TokenStream;

/// A position in the original source text: 1-based line, 1-based column,
/// and the 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
	pub line: u32,
	pub column: u32,
	pub offset: usize,
}

impl Position {
	pub fn start() -> Self {
		Self { line: 1, column: 1, offset: 0 }
	}
}

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
	Eof,
	Error,
	Null,
	True,
	False,
	Int,
	Float,
	String,
	BareStr,
	Ref,
	Time,
	LBrace,
	RBrace,
	LBracket,
	RBracket,
	LParen,
	RParen,
	LAngle,
	RAngle,
	Pipe,
	Comma,
	Eq,
	At,
	Hash,
	Ident,
}

/// A lexed token: its kind, its source-text slice, and its starting position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
	pub kind: TokenKind,
	pub lexeme: String,
	pub position: Position,
}

const RESERVED_NON_BARE: &[&str] = &["struct", "sum", "list", "map"];

/// Is `s` a valid bare identifier / bare string per the lexer grammar, and
/// not one of the words reserved for struct grammar (`struct`, `sum`,
/// `list`, `map`)?
pub fn is_bare_ident(s: &str) -> bool {
	let mut chars = s.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
		_ => return false,
	}
	if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
		return false;
	}
	!RESERVED_NON_BARE.contains(&s)
}

/// Tokenizes a full GLYPH-T source string.
pub struct Lexer<'a> {
	src: &'a str,
	bytes: &'a [u8],
	pos: usize,
	line: u32,
	column: u32,
}

impl<'a> Lexer<'a> {
	pub fn new(src: &'a str) -> Self {
		Self { src, bytes: src.as_bytes(), pos: 0, line: 1, column: 1 }
	}

	/// Lex the entire input into a flat token vector, terminated by `Eof`.
	pub fn tokenize(mut self) -> Vec<Token> {
		let mut out = Vec::new();
		loop {
			let tok = self.next_token();
			let is_eof = tok.kind == TokenKind::Eof;
			out.push(tok);
			if is_eof {
				break;
			}
		}
		out
	}

	fn position(&self) -> Position {
		Position { line: self.line, column: self.column, offset: self.pos }
	}

	fn peek_byte(&self) -> Option<u8> {
		self.bytes.get(self.pos).copied()
	}

	fn peek_byte_n(&self, n: usize) -> Option<u8> {
		self.bytes.get(self.pos + n).copied()
	}

	fn bump(&mut self) -> Option<char> {
		let rest = &self.src[self.pos..];
		let c = rest.chars().next()?;
		self.pos += c.len_utf8();
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn skip_trivia(&mut self) {
		loop {
			match self.peek_byte() {
				Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
					self.bump();
				}
				Some(b'/') if self.peek_byte_n(1) == Some(b'/') => {
					while let Some(c) = self.peek_byte() {
						if c == b'\n' {
							break;
						}
						self.bump();
					}
				}
				_ => break,
			}
		}
	}

	fn next_token(&mut self) -> Token {
		self.skip_trivia();
		let start = self.position();
		let Some(c) = self.peek_byte() else {
			return Token { kind: TokenKind::Eof, lexeme: String::new(), position: start };
		};

		// The null glyph is a single 3-byte UTF-8 sequence.
		if self.src[self.pos..].starts_with('\u{2205}') {
			self.bump();
			return Token { kind: TokenKind::Null, lexeme: "\u{2205}".into(), position: start };
		}

		match c {
			b'{' => self.single(TokenKind::LBrace, start),
			b'}' => self.single(TokenKind::RBrace, start),
			b'[' => self.single(TokenKind::LBracket, start),
			b']' => self.single(TokenKind::RBracket, start),
			b'(' => self.single(TokenKind::LParen, start),
			b')' => self.single(TokenKind::RParen, start),
			b'<' => self.single(TokenKind::LAngle, start),
			b'>' => self.single(TokenKind::RAngle, start),
			b'|' => self.single(TokenKind::Pipe, start),
			b',' => self.single(TokenKind::Comma, start),
			b'=' | b':' => self.single(TokenKind::Eq, start),
			b'@' => self.single(TokenKind::At, start),
			b'#' => self.single(TokenKind::Hash, start),
			b'"' => self.lex_string(start),
			b'^' => self.lex_ref(start),
			b'-' | b'0'..=b'9' => self.lex_number_or_time(start),
			c if c.is_ascii_alphabetic() || c == b'_' => self.lex_ident(start),
			_ => {
				self.bump();
				Token { kind: TokenKind::Error, lexeme: (c as char).to_string(), position: start }
			}
		}
	}

	fn single(&mut self, kind: TokenKind, start: Position) -> Token {
		let c = self.bump().expect("checked by caller");
		Token { kind, lexeme: c.to_string(), position: start }
	}

	fn lex_string(&mut self, start: Position) -> Token {
		self.bump(); // opening quote
		let mut out = String::new();
		loop {
			match self.bump() {
				None => {
					return Token { kind: TokenKind::Error, lexeme: out, position: start };
				}
				Some('"') => break,
				Some('\\') => match self.bump() {
					Some('n') => out.push('\n'),
					Some('r') => out.push('\r'),
					Some('t') => out.push('\t'),
					Some('\\') => out.push('\\'),
					Some('"') => out.push('"'),
					Some(other) => out.push(other), // unknown escape drops the backslash
					None => return Token { kind: TokenKind::Error, lexeme: out, position: start },
				},
				Some(c) => out.push(c),
			}
		}
		Token { kind: TokenKind::String, lexeme: out, position: start }
	}

	fn lex_ref(&mut self, start: Position) -> Token {
		self.bump(); // '^'
		let mut out = String::new();
		while let Some(c) = self.peek_byte() {
			let c = c as char;
			if c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-') {
				out.push(c);
				self.bump();
			} else {
				break;
			}
		}
		Token { kind: TokenKind::Ref, lexeme: out, position: start }
	}

	fn lex_number_or_time(&mut self, start: Position) -> Token {
		let from = self.pos;
		if self.peek_byte() == Some(b'-') {
			self.bump();
		}
		let digits_start = self.pos;
		while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
			self.bump();
		}
		let int_len = self.pos - digits_start;

		// Heuristic: bare digits >=4 immediately followed by '-' look like a
		// YYYY-MM-DD date; switch to time-token scanning.
		if int_len >= 4 && self.peek_byte() == Some(b'-') {
			while matches!(
				self.peek_byte(),
				Some(b'0'..=b'9') | Some(b'T') | Some(b':') | Some(b'Z') | Some(b'+') | Some(b'.') | Some(b'-')
			) {
				self.bump();
			}
			return Token {
				kind: TokenKind::Time,
				lexeme: self.src[from..self.pos].to_string(),
				position: start,
			};
		}

		let mut is_float = false;
		if self.peek_byte() == Some(b'.')
			&& matches!(self.peek_byte_n(1), Some(b'0'..=b'9'))
		{
			is_float = true;
			self.bump();
			while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
				self.bump();
			}
		}
		if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
			let (save_pos, save_line, save_col) = (self.pos, self.line, self.column);
			self.bump();
			if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
				self.bump();
			}
			if matches!(self.peek_byte(), Some(b'0'..=b'9')) {
				is_float = true;
				while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
					self.bump();
				}
			} else {
				// not actually an exponent; rewind
				self.pos = save_pos;
				self.line = save_line;
				self.column = save_col;
			}
		}

		let lexeme = self.src[from..self.pos].to_string();
		if lexeme.is_empty() || lexeme == "-" {
			return Token { kind: TokenKind::Error, lexeme, position: start };
		}
		Token {
			kind: if is_float { TokenKind::Float } else { TokenKind::Int },
			lexeme,
			position: start,
		}
	}

	fn lex_ident(&mut self, start: Position) -> Token {
		let from = self.pos;
		while let Some(c) = self.peek_byte() {
			let c = c as char;
			if c.is_ascii_alphanumeric() || c == '_' {
				self.bump();
			} else {
				break;
			}
		}
		let lexeme = self.src[from..self.pos].to_string();
		let kind = match lexeme.as_str() {
			"null" | "none" | "nil" => TokenKind::Null,
			"true" | "t" => TokenKind::True,
			"false" | "f" => TokenKind::False,
			_ => TokenKind::Ident,
		};
		Token { kind, lexeme, position: start }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(src: &str) -> Vec<TokenKind> {
		Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn punctuation() {
		assert_eq!(
			kinds("{}[]()<>|,=@#"),
			vec![
				TokenKind::LBrace,
				TokenKind::RBrace,
				TokenKind::LBracket,
				TokenKind::RBracket,
				TokenKind::LParen,
				TokenKind::RParen,
				TokenKind::LAngle,
				TokenKind::RAngle,
				TokenKind::Pipe,
				TokenKind::Comma,
				TokenKind::Eq,
				TokenKind::At,
				TokenKind::Hash,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn colon_and_eq_both_yield_eq() {
		assert_eq!(kinds(":"), vec![TokenKind::Eq, TokenKind::Eof]);
	}

	#[test]
	fn null_glyph() {
		assert_eq!(kinds("\u{2205}"), vec![TokenKind::Null, TokenKind::Eof]);
	}

	#[test]
	fn reserved_words() {
		assert_eq!(kinds("null none nil"), vec![TokenKind::Null; 3].into_iter().chain([TokenKind::Eof]).collect::<Vec<_>>());
		assert_eq!(kinds("true t"), vec![TokenKind::True, TokenKind::True, TokenKind::Eof]);
		assert_eq!(kinds("false f"), vec![TokenKind::False, TokenKind::False, TokenKind::Eof]);
	}

	#[test]
	fn struct_sum_list_map_are_idents() {
		assert_eq!(kinds("struct"), vec![TokenKind::Ident, TokenKind::Eof]);
		assert!(!is_bare_ident("struct"));
	}

	#[test]
	fn numbers() {
		assert_eq!(kinds("42"), vec![TokenKind::Int, TokenKind::Eof]);
		assert_eq!(kinds("-42"), vec![TokenKind::Int, TokenKind::Eof]);
		assert_eq!(kinds("1.72"), vec![TokenKind::Float, TokenKind::Eof]);
		assert_eq!(kinds("1e10"), vec![TokenKind::Float, TokenKind::Eof]);
		assert_eq!(kinds("-1.5e-3"), vec![TokenKind::Float, TokenKind::Eof]);
	}

	#[test]
	fn date_switches_to_time_mode() {
		let toks = Lexer::new("2024-01-02T03:04:05Z").tokenize();
		assert_eq!(toks[0].kind, TokenKind::Time);
		assert_eq!(toks[0].lexeme, "2024-01-02T03:04:05Z");
	}

	#[test]
	fn refs() {
		let toks = Lexer::new("^t:ARS").tokenize();
		assert_eq!(toks[0].kind, TokenKind::Ref);
		assert_eq!(toks[0].lexeme, "t:ARS");
	}

	#[test]
	fn strings_with_escapes() {
		let toks = Lexer::new(r#""a\nb\"c\q""#).tokenize();
		assert_eq!(toks[0].kind, TokenKind::String);
		assert_eq!(toks[0].lexeme, "a\nb\"cq");
	}

	#[test]
	fn unterminated_string_is_error() {
		let toks = Lexer::new("\"abc").tokenize();
		assert_eq!(toks[0].kind, TokenKind::Error);
	}

	#[test]
	fn line_comment_is_skipped() {
		assert_eq!(kinds("1 // comment\n2"), vec![TokenKind::Int, TokenKind::Int, TokenKind::Eof]);
	}

	#[test]
	fn position_tracks_lines() {
		let toks = Lexer::new("1\n2").tokenize();
		assert_eq!(toks[0].position, Position { line: 1, column: 1, offset: 0 });
		assert_eq!(toks[1].position, Position { line: 2, column: 1, offset: 2 });
	}
}
