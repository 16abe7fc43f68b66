//! Generic document model
//!
//! Scripts exchange schema-free documents with the store. `Value` is the
//! tagged variant used for every field, `Document` keeps field order so sort
//! specifications and pipeline stages survive the trip to the server.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId, spec::BinarySubtype, Bson};
use serde_json::Value as JsonValue;

/// Binary subtype marking a UUID payload
pub const UUID_SUBTYPE: u8 = 4;

/// Tagged binary payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    /// Subtype marker, `4` for UUIDs
    pub subtype: u8,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: u8, bytes: Vec<u8>) -> Self {
        Self { subtype, bytes }
    }

    /// Tag `bytes` as a UUID. Length is not checked here.
    pub fn uuid(bytes: Vec<u8>) -> Self {
        Self::new(UUID_SUBTYPE, bytes)
    }
}

/// Dynamically typed field value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Binary),
    DateTime(DateTime<Utc>),
    ObjectId([u8; 12]),
    Document(Document),
    Array(Vec<Value>),
    /// Store value with no script-side counterpart (decimal128, timestamp,
    /// regex, code, out-of-range dates, ...), written back unchanged
    Other(Bson),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view; integral floats count, since script numbers are floats
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Short type name used in argument errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::DateTime(_) => "date",
            Value::ObjectId(_) => "objectId",
            Value::Document(_) => "object",
            Value::Array(_) => "array",
            Value::Other(_) => "bson",
        }
    }

    /// Parse a JSON value. MongoDB extended JSON (`{"$oid": ..}`,
    /// `{"$date": ..}`, `{"$binary": ..}`) is recognized.
    pub fn from_json(json: JsonValue) -> Result<Self> {
        let bson = Bson::try_from(json)
            .map_err(|e| Error::InvalidArgument(format!("JSON to BSON error: {}", e)))?;
        Ok(Value::from(bson))
    }

    /// Relaxed extended JSON rendering
    pub fn to_json(&self) -> JsonValue {
        Bson::from(self.clone()).into_relaxed_extjson()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Binary> for Value {
    fn from(b: Binary) -> Self {
        Value::Binary(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Value> for Bson {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(b),
            Value::Int(i) => Bson::Int64(i),
            Value::Float(f) => Bson::Double(f),
            Value::String(s) => Bson::String(s),
            Value::Binary(b) => Bson::Binary(bson::Binary {
                subtype: BinarySubtype::from(b.subtype),
                bytes: b.bytes,
            }),
            Value::DateTime(dt) => {
                Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis()))
            }
            Value::ObjectId(bytes) => Bson::ObjectId(ObjectId::from_bytes(bytes)),
            Value::Document(d) => Bson::Document(d.into()),
            Value::Array(items) => Bson::Array(items.into_iter().map(Bson::from).collect()),
            Value::Other(bson) => bson,
        }
    }
}

impl From<Bson> for Value {
    fn from(bson: Bson) -> Self {
        match bson {
            Bson::Null => Value::Null,
            Bson::Boolean(b) => Value::Bool(b),
            Bson::Int32(i) => Value::Int(i64::from(i)),
            Bson::Int64(i) => Value::Int(i),
            Bson::Double(f) => Value::Float(f),
            Bson::String(s) => Value::String(s),
            Bson::Binary(b) => Value::Binary(Binary {
                subtype: u8::from(b.subtype),
                bytes: b.bytes,
            }),
            Bson::DateTime(dt) => DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
                .map(Value::DateTime)
                .unwrap_or(Value::Other(Bson::DateTime(dt))),
            Bson::ObjectId(oid) => Value::ObjectId(oid.bytes()),
            Bson::Document(d) => Value::Document(d.into()),
            Bson::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            other => Value::Other(other),
        }
    }
}

/// Ordered field/value mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Create new empty document
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field, builder style
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a field, replacing an existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Create from a JSON object
    pub fn from_json(json: JsonValue) -> Result<Self> {
        match Value::from_json(json)? {
            Value::Document(d) => Ok(d),
            other => Err(Error::InvalidArgument(format!(
                "document must be a JSON object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Convert to relaxed extended JSON
    pub fn to_json(&self) -> JsonValue {
        Bson::Document(self.clone().into()).into_relaxed_extjson()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl From<Document> for bson::Document {
    fn from(doc: Document) -> Self {
        doc.into_iter().map(|(k, v)| (k, Bson::from(v))).collect()
    }
}

impl From<bson::Document> for Document {
    fn from(doc: bson::Document) -> Self {
        Self {
            fields: doc.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde_json::json;

    #[test]
    fn test_document_keeps_field_order() {
        let doc = Document::new()
            .with_field("b", 1)
            .with_field("a", 2)
            .with_field("b", 3);

        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(doc.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_uuid_binary_to_bson() {
        let value = Value::Binary(Binary::uuid(vec![7; 16]));
        match Bson::from(value) {
            Bson::Binary(b) => {
                assert_eq!(b.subtype, BinarySubtype::Uuid);
                assert_eq!(b.bytes, vec![7; 16]);
            }
            other => panic!("unexpected bson: {:?}", other),
        }
    }

    #[test]
    fn test_bson_document_conversion() {
        let oid = ObjectId::new();
        let source = doc! {
            "_id": oid,
            "count": 5_i32,
            "ratio": 0.5,
            "tags": ["x", "y"],
            "nested": { "ok": true },
        };

        let doc = Document::from(source);
        assert_eq!(doc.get("_id"), Some(&Value::ObjectId(oid.bytes())));
        assert_eq!(doc.get("count").and_then(Value::as_i64), Some(5));
        assert_eq!(doc.get("ratio").and_then(Value::as_f64), Some(0.5));
        assert_eq!(
            doc.get("tags"),
            Some(&Value::Array(vec![Value::from("x"), Value::from("y")]))
        );
        let nested = doc.get("nested").and_then(Value::as_document).unwrap();
        assert_eq!(nested.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_datetime_truncates_to_millis() {
        let dt = DateTime::parse_from_rfc3339("2024-05-11T11:11:11.123456Z")
            .unwrap()
            .with_timezone(&Utc);

        let back = Value::from(Bson::from(Value::DateTime(dt)));
        let back = back.as_datetime().unwrap();
        assert_eq!(back.timestamp_millis(), dt.timestamp_millis());
    }

    #[test]
    fn test_document_from_json() {
        let doc = Document::from_json(json!({
            "title": "t",
            "when": { "$date": "2024-05-11T11:11:11Z" },
            "n": 3
        }))
        .unwrap();

        assert_eq!(doc.get("title").and_then(Value::as_str), Some("t"));
        assert!(doc.get("when").and_then(Value::as_datetime).is_some());
        assert_eq!(doc.get("n").and_then(Value::as_i64), Some(3));
    }

    #[test]
    fn test_document_from_json_rejects_non_object() {
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_integral_float_as_i64() {
        assert_eq!(Value::Float(10.0).as_i64(), Some(10));
        assert_eq!(Value::Float(-10.0).as_i64(), Some(-10));
        assert_eq!(Value::Float(10.5).as_i64(), None);
    }

    #[test]
    fn test_float_outside_i64_range_is_not_an_integer() {
        assert_eq!(Value::Float(1e20).as_i64(), None);
        assert_eq!(Value::Float(-1e20).as_i64(), None);
        assert_eq!(Value::Float(9_223_372_036_854_775_808.0).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
        assert_eq!(Value::Float(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
    }

    #[test]
    fn test_unmapped_bson_survives_round_trip() {
        let raw = doc! {
            "price": Bson::Decimal128(bson::Decimal128::from_bytes([
                0x96, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x3c, 0x30,
            ])),
            "ts": Bson::Timestamp(bson::Timestamp { time: 10, increment: 1 }),
            "old": Bson::DateTime(bson::DateTime::MIN),
            "pattern": Bson::RegularExpression(bson::Regex {
                pattern: "^a".to_string(),
                options: "i".to_string(),
            }),
            "code": Bson::JavaScriptCode("return 1".to_string()),
            "symbol": Bson::Symbol("s".to_string()),
            "undefined": Bson::Undefined,
            "max": Bson::MaxKey,
            "nested": { "when": Bson::Timestamp(bson::Timestamp { time: 1, increment: 2 }) },
        };

        let doc = Document::from(raw.clone());
        assert_eq!(doc.get("max"), Some(&Value::Other(Bson::MaxKey)));
        assert_eq!(doc.get("old").map(Value::type_name), Some("bson"));
        assert_eq!(bson::Document::from(doc), raw);
    }
}
