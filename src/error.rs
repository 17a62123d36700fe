//! Error taxonomy shared across the codec (spec §7)

use std::borrow::Cow;

use crate::lexer::Position;

/// Every distinct failure mode the codec can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GlyphErrorKind {
	// Lexical
	UnexpectedChar,
	UnterminatedString,
	InvalidNumber,
	InvalidTimestamp,

	// Syntactic
	UnexpectedToken,
	UnclosedContainer,
	EmptyInput,

	// Schematic
	UnknownType,
	UnknownField,
	UnknownFID,
	MissingRequired,
	BadBitmap,
	TypeMismatch,
	ConstraintViolated(ConstraintKind),

	// Patchwise
	BadPath,
	BaseFingerprintMismatch,
	DeltaOnNonNumeric,

	// JSON bridge
	NaNInf,
	UnsupportedJSONType,
	BadGlyphMarker,

	// Blob / storage
	BlobNotFound,
	UnsupportedHashAlgorithm,
}

/// Which constraint was violated, for [`GlyphErrorKind::ConstraintViolated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
	Min,
	Max,
	Pattern,
	MinLen,
	MaxLen,
}

/// Any error produced by the codec.
///
/// Boxed so that the common success path never pays for the size of the
/// largest variant.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", inner.message)]
pub struct GlyphError {
	inner: Box<ErrorInner>,
}

#[derive(Clone, PartialEq, Eq)]
struct ErrorInner {
	kind: GlyphErrorKind,
	message: Cow<'static, str>,
	position: Option<Position>,
}

impl GlyphError {
	pub fn new(kind: GlyphErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				message: message.into(),
				position: None,
			}),
		}
	}

	pub fn at(kind: GlyphErrorKind, message: impl Into<Cow<'static, str>>, position: Position) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				message: message.into(),
				position: Some(position),
			}),
		}
	}

	pub fn kind(&self) -> &GlyphErrorKind {
		&self.inner.kind
	}

	pub fn position(&self) -> Option<Position> {
		self.inner.position
	}
}

impl std::fmt::Debug for GlyphError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GlyphError")
			.field("kind", &self.inner.kind)
			.field("message", &self.inner.message)
			.field("position", &self.inner.position)
			.finish()
	}
}

/// A single recoverable issue surfaced by the tolerant parser or the
/// streaming validator.
///
/// Unlike [`GlyphError`], a `Diagnostic` never aborts the operation that
/// produced it: it is pushed into a `Vec` and the caller decides what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub kind: GlyphErrorKind,
	pub message: String,
	pub position: Option<Position>,
}

impl Diagnostic {
	pub fn new(kind: GlyphErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			position: None,
		}
	}

	pub fn at(kind: GlyphErrorKind, message: impl Into<String>, position: Position) -> Self {
		Self {
			kind,
			message: message.into(),
			position: Some(position),
		}
	}
}

impl From<Diagnostic> for GlyphError {
	fn from(d: Diagnostic) -> Self {
		match d.position {
			Some(pos) => GlyphError::at(d.kind, d.message, pos),
			None => GlyphError::new(d.kind, d.message),
		}
	}
}

pub type Result<T> = std::result::Result<T, GlyphError>;
