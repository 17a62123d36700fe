//! Bridging GLYPH values to and from JSON (spec §6 "JSON bridge").
//!
//! Two conversions: [`to_json_strict`]/[`from_json_strict`] map onto JSON's
//! native types only — lossy, since struct type names and GLYPH-only kinds
//! (`Ref`, `Time`, `Bytes`, `Sum`, `Blob`, `PoolRef`) have no JSON
//! counterpart. [`to_json_extended`]/[`from_json_extended`] wrap anything
//! JSON can't express natively in a `{"$glyph": "<kind>", …}` marker
//! object, making the round trip lossless.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use serde_json::{Map, Number, Value as Json};

use crate::error::{GlyphError, GlyphErrorKind};
use crate::value::{Blob, Cid, PoolRef, Value, ValueKind};

pub fn to_json_strict(value: &Value) -> Result<Json, GlyphError> {
	match &value.kind {
		ValueKind::Null => Ok(Json::Null),
		ValueKind::Bool(b) => Ok(Json::Bool(*b)),
		ValueKind::Int(n) => Ok(Json::Number((*n).into())),
		ValueKind::Float(f) => Number::from_f64(*f)
			.map(Json::Number)
			.ok_or_else(|| GlyphError::new(GlyphErrorKind::NaNInf, "NaN/Infinity cannot be represented in strict JSON")),
		ValueKind::Str(s) => Ok(Json::String(s.clone())),
		ValueKind::List(items) => items.iter().map(to_json_strict).collect::<Result<Vec<_>, _>>().map(Json::Array),
		ValueKind::Map(entries) => {
			let mut map = Map::new();
			for (k, v) in entries {
				map.insert(k.clone(), to_json_strict(v)?);
			}
			Ok(Json::Object(map))
		}
		ValueKind::Struct(s) => {
			let mut map = Map::new();
			for (k, v) in &s.fields {
				map.insert(k.clone(), to_json_strict(v)?);
			}
			Ok(Json::Object(map))
		}
		// Lossy but native: bytes/time/id all become plain JSON strings in
		// strict mode (spec §6 "JSON bridge" strict mapping table) — only
		// the extended bridge's `$glyph` markers keep them distinguishable
		// from an ordinary `Str` on the way back.
		ValueKind::Bytes(b) => Ok(Json::String(BASE64.encode(b))),
		ValueKind::Time(t) => Ok(Json::String(t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))),
		ValueKind::Ref(r) => Ok(Json::String(ref_to_string(r))),
		ValueKind::Sum(s) => {
			let mut map = Map::new();
			map.insert(s.tag.clone(), s.value.as_deref().map(to_json_strict).transpose()?.unwrap_or(Json::Null));
			Ok(Json::Object(map))
		}
		other => Err(GlyphError::new(
			GlyphErrorKind::UnsupportedJSONType,
			format!("{other:?} has no native JSON representation; use the extended bridge"),
		)),
	}
}

fn ref_to_string(r: &crate::value::RefId) -> String {
	match &r.prefix {
		Some(p) => format!("^{p}:{}", r.value),
		None => format!("^{}", r.value),
	}
}

pub fn from_json_strict(json: &Json) -> Result<Value, GlyphError> {
	match json {
		Json::Null => Ok(Value::null()),
		Json::Bool(b) => Ok(Value::bool(*b)),
		Json::Number(n) => number_to_value(n),
		Json::String(s) => Ok(Value::str(s.clone())),
		Json::Array(items) => items.iter().map(from_json_strict).collect::<Result<Vec<_>, _>>().map(Value::list),
		Json::Object(map) => {
			let entries = map.iter().map(|(k, v)| from_json_strict(v).map(|v| (k.clone(), v))).collect::<Result<Vec<_>, _>>()?;
			Ok(Value::map(entries))
		}
	}
}

fn number_to_value(n: &Number) -> Result<Value, GlyphError> {
	if let Some(i) = n.as_i64() {
		Ok(Value::int(i))
	} else if let Some(f) = n.as_f64() {
		Ok(Value::float(f))
	} else {
		Err(GlyphError::new(GlyphErrorKind::UnsupportedJSONType, format!("number {n} is out of range")))
	}
}

fn marker<const N: usize>(kind: &str, fields: [(&str, Json); N]) -> Json {
	let mut map = Map::new();
	map.insert("$glyph".to_string(), Json::String(kind.to_string()));
	for (k, v) in fields {
		map.insert(k.to_string(), v);
	}
	Json::Object(map)
}

/// NaN/±Inf are rejected in both bridges (spec §6 "JSON bridge") — the
/// extended bridge's `$glyph` markers exist to round-trip kinds JSON has no
/// native slot for, not to smuggle values JSON can't represent at all.
pub fn to_json_extended(value: &Value) -> Result<Json, GlyphError> {
	Ok(match &value.kind {
		ValueKind::Null => Json::Null,
		ValueKind::Bool(b) => Json::Bool(*b),
		ValueKind::Int(n) => Json::Number((*n).into()),
		ValueKind::Float(f) => Number::from_f64(*f)
			.map(Json::Number)
			.ok_or_else(|| GlyphError::new(GlyphErrorKind::NaNInf, "NaN/Infinity cannot be represented in the JSON bridge"))?,
		ValueKind::Str(s) => Json::String(s.clone()),
		ValueKind::Bytes(b) => marker("bytes", [("b64", Json::String(BASE64.encode(b)))]),
		ValueKind::Time(t) => marker("time", [("value", Json::String(t.to_rfc3339()))]),
		ValueKind::Ref(r) => marker(
			"ref",
			[
				("prefix", r.prefix.clone().map(Json::String).unwrap_or(Json::Null)),
				("value", Json::String(r.value.clone())),
			],
		),
		ValueKind::List(items) => Json::Array(items.iter().map(to_json_extended).collect::<Result<_, _>>()?),
		ValueKind::Map(entries) => {
			let mut map = Map::new();
			for (k, v) in entries {
				map.insert(k.clone(), to_json_extended(v)?);
			}
			Json::Object(map)
		}
		ValueKind::Struct(s) => {
			let mut map = Map::new();
			for (k, v) in &s.fields {
				map.insert(k.clone(), to_json_extended(v)?);
			}
			map.insert("$glyph".to_string(), Json::String("struct".to_string()));
			map.insert("$type".to_string(), Json::String(s.type_name.clone()));
			Json::Object(map)
		}
		ValueKind::Sum(s) => marker(
			"sum",
			[
				("tag", Json::String(s.tag.clone())),
				("value", s.value.as_deref().map(to_json_extended).transpose()?.unwrap_or(Json::Null)),
			],
		),
		ValueKind::Blob(b) => marker(
			"blob",
			[
				("cid", Json::String(b.cid.to_string())),
				("mime", Json::String(b.mime.clone())),
				("name", b.name.clone().map(Json::String).unwrap_or(Json::Null)),
			],
		),
		ValueKind::PoolRef(p) => marker("pool", [("handle", Json::String(p.0.clone()))]),
	})
}

fn marker_err(kind: &str) -> GlyphError {
	GlyphError::new(GlyphErrorKind::BadGlyphMarker, format!("malformed \"$glyph\":{kind:?} marker"))
}

pub fn from_json_extended(json: &Json) -> Result<Value, GlyphError> {
	match json {
		Json::Null => Ok(Value::null()),
		Json::Bool(b) => Ok(Value::bool(*b)),
		Json::Number(n) => number_to_value(n),
		Json::String(s) => Ok(Value::str(s.clone())),
		Json::Array(items) => items.iter().map(from_json_extended).collect::<Result<Vec<_>, _>>().map(Value::list),
		Json::Object(map) => match map.get("$glyph").and_then(Json::as_str) {
			Some("bytes") => {
				let b64 = map.get("b64").and_then(Json::as_str).ok_or_else(|| marker_err("bytes"))?;
				let bytes = BASE64.decode(b64).map_err(|_| marker_err("bytes"))?;
				Ok(Value::bytes(bytes))
			}
			Some("time") => {
				let s = map.get("value").and_then(Json::as_str).ok_or_else(|| marker_err("time"))?;
				let dt = chrono::DateTime::parse_from_rfc3339(s).map_err(|_| marker_err("time"))?;
				Ok(Value::time(dt.with_timezone(&Utc)))
			}
			Some("ref") => {
				let prefix = map.get("prefix").and_then(Json::as_str).map(str::to_string);
				let v = map.get("value").and_then(Json::as_str).ok_or_else(|| marker_err("ref"))?;
				Ok(Value::reference(prefix, v))
			}
			Some("sum") => {
				let tag = map.get("tag").and_then(Json::as_str).ok_or_else(|| marker_err("sum"))?.to_string();
				let inner = match map.get("value") {
					Some(Json::Null) | None => None,
					Some(v) => Some(from_json_extended(v)?),
				};
				Ok(Value::sum(tag, inner))
			}
			Some("blob") => {
				let cid: Cid = map
					.get("cid")
					.and_then(Json::as_str)
					.ok_or_else(|| marker_err("blob"))?
					.parse()?;
				let mime = map.get("mime").and_then(Json::as_str).unwrap_or_default().to_string();
				let name = map.get("name").and_then(Json::as_str).map(str::to_string);
				Ok(Value::new(ValueKind::Blob(Blob { cid, mime, bytes: Vec::new(), name, caption: None, preview: None })))
			}
			Some("pool") => {
				let handle = map.get("handle").and_then(Json::as_str).ok_or_else(|| marker_err("pool"))?.to_string();
				Ok(Value::new(ValueKind::PoolRef(PoolRef(handle))))
			}
			Some("struct") => {
				let type_name = map.get("$type").and_then(Json::as_str).ok_or_else(|| marker_err("struct"))?.to_string();
				let mut fields = Vec::new();
				for (k, v) in map {
					if k == "$glyph" || k == "$type" {
						continue;
					}
					fields.push((k.clone(), from_json_extended(v)?));
				}
				Ok(Value::strct(type_name, fields))
			}
			Some(other) => Err(GlyphError::new(GlyphErrorKind::BadGlyphMarker, format!("unknown $glyph marker kind {other:?}"))),
			None => {
				let entries = map.iter().map(|(k, v)| from_json_extended(v).map(|v| (k.clone(), v))).collect::<Result<Vec<_>, _>>()?;
				Ok(Value::map(entries))
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strict_bridge_round_trips_plain_data() {
		let v = Value::map(vec![("n".into(), Value::str("Arsenal")), ("xH".into(), Value::float(1.72))]);
		let json = to_json_strict(&v).unwrap();
		let back = from_json_strict(&json).unwrap();
		assert_eq!(back.get("n"), Some(&Value::str("Arsenal")));
	}

	#[test]
	fn strict_bridge_renders_a_ref_as_its_string_form() {
		let v = Value::reference(Some("m".into()), "ARS-LIV");
		assert_eq!(to_json_strict(&v).unwrap(), Json::String("^m:ARS-LIV".to_string()));
	}

	#[test]
	fn strict_bridge_refuses_a_blob() {
		let v = Value::new(ValueKind::Blob(Blob {
			cid: "sha256:ab".parse().unwrap(),
			mime: "image/png".into(),
			bytes: Vec::new(),
			name: None,
			caption: None,
			preview: None,
		}));
		assert!(to_json_strict(&v).is_err());
	}

	#[test]
	fn strict_bridge_renders_a_sum_as_a_tag_keyed_object() {
		let v = Value::sum("Active", Some(Value::int(3)));
		assert_eq!(to_json_strict(&v).unwrap(), serde_json::json!({"Active": 3}));
	}

	#[test]
	fn extended_bridge_round_trips_bytes_and_ref() {
		let bytes = Value::bytes(vec![1, 2, 3]);
		let json = to_json_extended(&bytes).unwrap();
		assert_eq!(from_json_extended(&json).unwrap(), bytes);

		let reference = Value::reference(Some("m".into()), "ARS-LIV");
		let json = to_json_extended(&reference).unwrap();
		assert_eq!(from_json_extended(&json).unwrap(), reference);
	}

	#[test]
	fn extended_bridge_round_trips_a_struct() {
		let v = Value::strct("Team", vec![("name".into(), Value::str("Arsenal"))]);
		let json = to_json_extended(&v).unwrap();
		let back = from_json_extended(&json).unwrap();
		assert_eq!(back, v);
	}

	#[test]
	fn extended_bridge_rejects_nan_and_infinity() {
		assert!(to_json_extended(&Value::float(f64::NAN)).is_err());
		assert!(to_json_extended(&Value::float(f64::INFINITY)).is_err());
	}
}
