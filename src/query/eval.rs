use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, SortSpec};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Cmp { path, op, value } => get_path(doc, path).is_some_and(|v| match v {
            // Array fields match when any element satisfies the comparison.
            Bson::Array(items) if !matches!(value, Bson::Array(_)) => {
                items.iter().any(|item| cmp_matches(item, *op, value))
            }
            _ => cmp_matches(v, *op, value),
        }),
        Filter::GeoWithin { path, longitude, latitude, radius } => get_path(doc, path)
            .and_then(point_coordinates)
            .is_some_and(|(lng, lat)| {
                crate::geo::central_angle(*longitude, *latitude, lng, lat) <= *radius
            }),
    }
}

fn cmp_matches(v: &Bson, op: CmpOp, value: &Bson) -> bool {
    match op {
        CmpOp::Eq => values_equal(v, value),
        CmpOp::Gt => comparable(v, value) && compare_bson(v, value) == Ordering::Greater,
        CmpOp::Gte => comparable(v, value) && compare_bson(v, value) != Ordering::Less,
        CmpOp::Lt => comparable(v, value) && compare_bson(v, value) == Ordering::Less,
        CmpOp::Lte => comparable(v, value) && compare_bson(v, value) != Ordering::Greater,
    }
}

fn point_coordinates(v: &Bson) -> Option<(f64, f64)> {
    let Bson::Document(d) = v else { return None };
    match d.get("coordinates") {
        Some(Bson::Array(c)) if c.len() == 2 => Some((as_f64(&c[0])?, as_f64(&c[1])?)),
        _ => None,
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    match v {
        Bson::Array(items) => items.iter().any(|item| is_in_set(item, set)),
        _ => set.iter().take(MAX_IN_SET).any(|x| values_equal(v, x)),
    }
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut segs = 0usize;
    while let Some(part) = parts.next() {
        segs += 1;
        if segs > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn as_f64(x: &Bson) -> Option<f64> {
    match x {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn as_millis(x: &Bson) -> Option<i64> {
    match x {
        Bson::DateTime(d) => Some(d.timestamp_millis()),
        Bson::String(s) => parse_date_millis(s),
        _ => None,
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
fn parse_date_millis(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Numeric view of a value, admitting numeric strings on either side.
fn numeric_pair(a: &Bson, b: &Bson) -> Option<(f64, f64)> {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => Some((x, y)),
        (Some(x), None) => match b {
            Bson::String(s) => s.trim().parse::<f64>().ok().map(|y| (x, y)),
            _ => None,
        },
        (None, Some(y)) => match a {
            Bson::String(s) => s.trim().parse::<f64>().ok().map(|x| (x, y)),
            _ => None,
        },
        (None, None) => None,
    }
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    numeric_pair(a, b).is_some()
        || matches!((a, b), (Bson::String(_), Bson::String(_)) | (Bson::Boolean(_), Bson::Boolean(_)))
        || (matches!(a, Bson::DateTime(_)) || matches!(b, Bson::DateTime(_)))
            && as_millis(a).is_some()
            && as_millis(b).is_some()
}

/// Equality with the loose casting a schema'd store applies: numbers across widths,
/// numeric strings against numbers, ObjectIds against their hex form, dates against
/// date strings.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::ObjectId(x), Bson::String(s)) | (Bson::String(s), Bson::ObjectId(x)) => {
            x.to_hex() == *s
        }
        (Bson::String(x), Bson::String(y)) => x == y,
        (Bson::DateTime(_), _) | (_, Bson::DateTime(_)) => {
            matches!((as_millis(a), as_millis(b)), (Some(x), Some(y)) if x == y)
        }
        _ => match numeric_pair(a, b) {
            Some((x, y)) => x == y,
            None => a == b,
        },
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if let Some((x, y)) = numeric_pair(a, b) {
        return x.total_cmp(&y);
    }
    if (matches!(a, Bson::DateTime(_)) || matches!(b, Bson::DateTime(_)))
        && let (Some(x), Some(y)) = (as_millis(a), as_millis(b))
    {
        return x.cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::String(_) | T::Symbol(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::DbPointer(_) => 12,
        T::JavaScriptCode(_) | T::JavaScriptCodeWithScope(_) => 13,
        T::MaxKey => 255,
    }
}

/// Keeps `_id` plus the listed top-level fields.
pub fn project_fields(doc: &BsonDocument, fields: &[String]) -> BsonDocument {
    let mut out = BsonDocument::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for f in fields {
        if let Some(v) = doc.get(f) {
            out.insert(f.clone(), v.clone());
        }
    }
    out
}
