//! The tagged value tree (spec §3)

use chrono::{DateTime, Utc};

use crate::lexer::Position;

/// A node in the GLYPH value tree.
///
/// Values are logically immutable: the patch engine's `apply`/`diff`
/// operations deep-copy before mutating (spec §4.7).
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
	pub kind: ValueKind,
	pub position: Option<Position>,
}

impl Value {
	pub fn new(kind: ValueKind) -> Self {
		Self { kind, position: None }
	}

	pub fn with_position(mut self, position: Position) -> Self {
		self.position = Some(position);
		self
	}

	pub fn null() -> Self {
		Self::new(ValueKind::Null)
	}
	pub fn bool(b: bool) -> Self {
		Self::new(ValueKind::Bool(b))
	}
	pub fn int(n: i64) -> Self {
		Self::new(ValueKind::Int(n))
	}
	pub fn float(f: f64) -> Self {
		Self::new(ValueKind::Float(f))
	}
	pub fn str(s: impl Into<String>) -> Self {
		Self::new(ValueKind::Str(s.into()))
	}
	pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
		Self::new(ValueKind::Bytes(b.into()))
	}
	pub fn time(t: DateTime<Utc>) -> Self {
		Self::new(ValueKind::Time(t))
	}
	pub fn reference(prefix: Option<String>, value: impl Into<String>) -> Self {
		Self::new(ValueKind::Ref(RefId { prefix, value: value.into() }))
	}
	pub fn list(items: Vec<Value>) -> Self {
		Self::new(ValueKind::List(items))
	}
	pub fn map(entries: Vec<(String, Value)>) -> Self {
		Self::new(ValueKind::Map(entries))
	}
	pub fn strct(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
		Self::new(ValueKind::Struct(StructValue { type_name: type_name.into(), fields }))
	}
	pub fn sum(tag: impl Into<String>, value: Option<Value>) -> Self {
		Self::new(ValueKind::Sum(SumValue { tag: tag.into(), value: value.map(Box::new) }))
	}

	pub fn is_null(&self) -> bool {
		matches!(self.kind, ValueKind::Null)
	}

	/// Look up a field by name in a `Struct`, or an entry by key in a `Map`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		match &self.kind {
			ValueKind::Struct(s) => s.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
			ValueKind::Map(m) => m.iter().find(|(k, _)| k == key).map(|(_, v)| v),
			_ => None,
		}
	}

	/// Mutable lookup used by the patch applier.
	pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
		match &mut self.kind {
			ValueKind::Struct(s) => s.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
			ValueKind::Map(m) => m.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	Bytes(Vec<u8>),
	Time(DateTime<Utc>),
	Ref(RefId),
	List(Vec<Value>),
	Map(Vec<(String, Value)>),
	Struct(StructValue),
	Sum(SumValue),
	Blob(Blob),
	PoolRef(PoolRef),
}

/// `^prefix:value`, or `^value` when `prefix` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefId {
	pub prefix: Option<String>,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
	pub type_name: String,
	pub fields: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumValue {
	pub tag: String,
	pub value: Option<Box<Value>>,
}

/// Content identifier: `<algo>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cid {
	pub algo: String,
	pub hex: String,
}

impl std::fmt::Display for Cid {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.algo, self.hex)
	}
}

impl std::str::FromStr for Cid {
	type Err = crate::error::GlyphError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (algo, hex) = s.split_once(':').ok_or_else(|| {
			crate::error::GlyphError::new(
				crate::error::GlyphErrorKind::UnsupportedHashAlgorithm,
				format!("malformed content identifier: {s:?}"),
			)
		})?;
		Ok(Cid { algo: algo.to_string(), hex: hex.to_string() })
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
	pub cid: Cid,
	pub mime: String,
	pub bytes: Vec<u8>,
	pub name: Option<String>,
	pub caption: Option<String>,
	pub preview: Option<String>,
}

/// An opaque handle into an out-of-band pool, interned by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRef(pub String);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn struct_field_lookup() {
		let v = Value::strct("Team", vec![("id".into(), Value::str("ARS"))]);
		assert_eq!(v.get("id"), Some(&Value::str("ARS")));
		assert_eq!(v.get("missing"), None);
	}

	#[test]
	fn cid_round_trip() {
		let cid: Cid = "sha256:abcd".parse().unwrap();
		assert_eq!(cid.to_string(), "sha256:abcd");
	}
}
