//! Field accessors, validation helpers and lenient input decoding shared by the models.

use crate::errors::DbError;
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9\-._~%]+(:\d+)?(/[^\s]*)?$").expect("url pattern compiles")
});

#[must_use]
pub fn is_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

#[must_use]
pub fn is_url(s: &str) -> bool {
    URL_RE.is_match(s)
}

/// Collects schema violations in field order.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn check(&mut self, ok: bool, msg: impl Into<String>) {
        if !ok {
            self.0.push(msg.into());
        }
    }

    pub fn required(&mut self, value: &str, msg: &str) {
        self.check(!value.trim().is_empty(), msg);
    }

    pub fn max_len(&mut self, value: &str, max: usize, msg: &str) {
        self.check(value.chars().count() <= max, msg);
    }

    /// # Errors
    /// `DbError::Validation` carrying every message when any check failed.
    pub fn into_result(self) -> Result<(), DbError> {
        if self.0.is_empty() { Ok(()) } else { Err(DbError::Validation(self.0)) }
    }
}

pub fn get_string(doc: &BsonDocument, key: &str) -> String {
    doc.get_str(key).unwrap_or_default().to_string()
}

pub fn get_opt_string(doc: &BsonDocument, key: &str) -> Option<String> {
    doc.get_str(key).ok().map(str::to_string)
}

pub fn get_f64(doc: &BsonDocument, key: &str) -> Option<f64> {
    match doc.get(key) {
        Some(Bson::Double(f)) => Some(*f),
        Some(Bson::Int32(i)) => Some(f64::from(*i)),
        Some(Bson::Int64(i)) => Some(*i as f64),
        _ => None,
    }
}

pub fn get_bool(doc: &BsonDocument, key: &str) -> bool {
    doc.get_bool(key).unwrap_or(false)
}

pub fn get_strings(doc: &BsonDocument, key: &str) -> Vec<String> {
    doc.get_array(key)
        .map(|items| items.iter().filter_map(|b| b.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// # Errors
/// `DbError::InvalidDocumentId` when the field is missing or not an ObjectId.
pub fn get_oid(doc: &BsonDocument, key: &str) -> Result<ObjectId, DbError> {
    match doc.get(key) {
        Some(Bson::ObjectId(id)) => Ok(*id),
        other => Err(DbError::InvalidDocumentId(format!(
            "{key}: {}",
            other.map_or_else(|| "missing".to_string(), ToString::to_string)
        ))),
    }
}

pub fn get_datetime(doc: &BsonDocument, key: &str) -> Option<DateTime<Utc>> {
    match doc.get(key) {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis()),
        _ => None,
    }
}

#[must_use]
pub fn to_bson_datetime(dt: &DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

/// Puts `value` under `key`, or nothing when absent.
pub fn insert_opt(doc: &mut BsonDocument, key: &str, value: Option<impl Into<Bson>>) {
    if let Some(v) = value {
        doc.insert(key, v.into());
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Accepts `"8"` as well as `8` for string-typed fields.
///
/// # Errors
/// Fails for values that are neither strings nor numbers.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    }))
}

/// Accepts `8000` as well as `"8000"` for number-typed fields.
///
/// # Errors
/// Fails for strings that do not parse as numbers.
pub fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Int(i)) => Ok(Some(i as f64)),
        Some(StringOrNumber::Float(f)) => Ok(Some(f)),
        Some(StringOrNumber::Str(s)) => {
            s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

/// Lowercase, with runs of non-alphanumerics collapsed to single dashes.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
