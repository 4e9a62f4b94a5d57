//! BSON to API JSON conversion.
//!
//! ObjectIds render as 24-char hex strings and datetimes as RFC 3339 with millisecond
//! precision. Integral doubles render as JSON integers.

use bson::{Bson, Document as BsonDocument};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[must_use]
pub fn document_to_json(doc: &BsonDocument) -> Value {
    Value::Object(document_to_map(doc))
}

#[must_use]
pub fn document_to_map(doc: &BsonDocument) -> Map<String, Value> {
    doc.iter().map(|(k, v)| (k.clone(), bson_to_json(v))).collect()
}

#[must_use]
pub fn bson_to_json(v: &Bson) -> Value {
    match v {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            Value::from(*f as i64)
        }
        Bson::Double(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(render_datetime(*dt)),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(d) => document_to_json(d),
        other => Value::String(other.to_string()),
    }
}

#[must_use]
pub fn render_datetime(dt: bson::DateTime) -> String {
    chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
        .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
