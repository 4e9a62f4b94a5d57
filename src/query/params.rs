//! Query-string grammar for list endpoints.
//!
//! `field=value` is equality, `field[op]=value` applies one of `gt`, `gte`, `lt`, `lte`,
//! `in` (comma separated). `select`, `sort`, `page` and `limit` are control keys and never
//! become filter conditions.

use bson::Bson;
use thiserror::Error;

use super::types::{CmpOp, Filter, FindOptions, SortSpec};

pub const RESERVED_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("Unknown query operator '{op}' on field '{field}'")]
    UnknownOperator { field: String, op: String },

    #[error("Unbalanced brackets in query key '{0}'")]
    UnbalancedBracket(String),

    #[error("Empty field name in query key '{0}'")]
    EmptyField(String),

    #[error("Empty 'in' list for field '{0}'")]
    EmptyInList(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }
}

/// One `(field, operator, value)` triple. For `In` the value is a `Bson::Array`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Bson,
}

impl Condition {
    #[must_use]
    pub fn to_filter(&self) -> Filter {
        let path = self.field.clone();
        let value = self.value.clone();
        match self.op {
            Operator::In => match value {
                Bson::Array(values) => Filter::In { path, values },
                other => Filter::In { path, values: vec![other] },
            },
            Operator::Eq => Filter::Cmp { path, op: CmpOp::Eq, value },
            Operator::Gt => Filter::Cmp { path, op: CmpOp::Gt, value },
            Operator::Gte => Filter::Cmp { path, op: CmpOp::Gte, value },
            Operator::Lt => Filter::Cmp { path, op: CmpOp::Lt, value },
            Operator::Lte => Filter::Cmp { path, op: CmpOp::Lte, value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDefaults {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PageDefaults {
    fn default() -> Self {
        Self { default_limit: 25, max_limit: 100 }
    }
}

/// A parsed list request: filter conditions plus the control keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortSpec>,
    pub page: usize,
    pub limit: usize,
}

impl ListQuery {
    /// Conjunction of all conditions; repeated fields are AND-ed.
    #[must_use]
    pub fn filter(&self) -> Filter {
        Filter::and(self.conditions.iter().map(Condition::to_filter).collect())
    }

    #[must_use]
    pub fn skip(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }

    #[must_use]
    pub fn find_options(&self) -> FindOptions {
        FindOptions {
            projection: self.select.clone(),
            sort: Some(self.sort.clone()),
            limit: Some(self.limit),
            skip: Some(self.skip()),
        }
    }

    /// Whether the projection (if any) keeps `field`.
    #[must_use]
    pub fn selects(&self, field: &str) -> bool {
        self.select.as_ref().is_none_or(|s| s.iter().any(|f| f == field))
    }
}

/// Parses decoded query-string pairs in their original order.
///
/// # Errors
/// Returns a [`QueryParseError`] for a malformed filter key or an empty `in` list.
pub fn parse_pairs<I, K, V>(pairs: I, defaults: &PageDefaults) -> Result<ListQuery, QueryParseError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut conditions = Vec::new();
    let (mut select, mut sort, mut page, mut limit) = (None, None, None, None);
    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            // last occurrence wins
            "select" => select = Some(value.to_string()),
            "sort" => sort = Some(value.to_string()),
            "page" => page = Some(value.to_string()),
            "limit" => limit = Some(value.to_string()),
            _ => conditions.push(parse_condition(key, value)?),
        }
    }

    let page = page.as_deref().and_then(parse_positive).unwrap_or(1);
    let limit = limit
        .as_deref()
        .and_then(parse_positive)
        .unwrap_or(defaults.default_limit)
        .clamp(1, defaults.max_limit.max(1));

    Ok(ListQuery {
        conditions,
        select: select.as_deref().and_then(parse_select),
        sort: sort.as_deref().map(parse_sort).filter(|s| !s.is_empty()).unwrap_or_else(|| {
            vec![SortSpec::desc(DEFAULT_SORT_FIELD)]
        }),
        page,
        limit,
    })
}

fn parse_positive(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok().filter(|n| *n >= 1)
}

fn comma_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

fn parse_select(s: &str) -> Option<Vec<String>> {
    let fields: Vec<String> = comma_list(s).map(str::to_string).collect();
    (!fields.is_empty()).then_some(fields)
}

fn parse_sort(s: &str) -> Vec<SortSpec> {
    comma_list(s)
        .filter_map(|f| match f.strip_prefix('-') {
            Some("") => None,
            Some(rest) => Some(SortSpec::desc(rest)),
            None => Some(SortSpec::asc(f.strip_prefix('+').unwrap_or(f))),
        })
        .collect()
}

fn parse_condition(key: &str, value: &str) -> Result<Condition, QueryParseError> {
    let (field, op) = match key.find('[') {
        None if key.contains(']') => return Err(QueryParseError::UnbalancedBracket(key.into())),
        None => (key, Operator::Eq),
        Some(open) => {
            let inner = key[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| QueryParseError::UnbalancedBracket(key.into()))?;
            if inner.contains('[') || inner.contains(']') {
                return Err(QueryParseError::UnbalancedBracket(key.into()));
            }
            let field = &key[..open];
            let op = Operator::from_token(inner).ok_or_else(|| QueryParseError::UnknownOperator {
                field: field.to_string(),
                op: inner.to_string(),
            })?;
            (field, op)
        }
    };
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(QueryParseError::EmptyField(key.into()));
    }
    let value = if op == Operator::In {
        let items: Vec<Bson> = comma_list(value).map(coerce_value).collect();
        if items.is_empty() {
            return Err(QueryParseError::EmptyInList(field.into()));
        }
        Bson::Array(items)
    } else {
        coerce_value(value)
    };
    Ok(Condition { field: field.to_string(), op, value })
}

/// Best-effort scalar typing: canonical integers, decimal numbers, booleans, else string.
/// Values such as zip codes with leading zeros stay strings.
#[must_use]
pub fn coerce_value(raw: &str) -> Bson {
    match raw {
        "true" => return Bson::Boolean(true),
        "false" => return Bson::Boolean(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>()
        && n.to_string() == raw
    {
        return Bson::Int64(n);
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    let leading_zero = digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.");
    if raw.contains('.')
        && !leading_zero
        && !digits.starts_with('.')
        && !digits.ends_with('.')
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && let Ok(f) = raw.parse::<f64>()
        && f.is_finite()
    {
        return Bson::Double(f);
    }
    Bson::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Order;

    fn parse(pairs: &[(&str, &str)]) -> Result<ListQuery, QueryParseError> {
        parse_pairs(pairs.iter().copied(), &PageDefaults::default())
    }

    #[test]
    fn bracket_operators_become_comparisons() {
        let q = parse(&[("averageCost[lte]", "10000"), ("housing", "true")]).unwrap();
        assert_eq!(
            q.conditions[0],
            Condition { field: "averageCost".into(), op: Operator::Lte, value: Bson::Int64(10000) }
        );
        assert_eq!(q.conditions[1].value, Bson::Boolean(true));
        assert!(matches!(q.filter(), Filter::And(ref fs) if fs.len() == 2));
    }

    #[test]
    fn in_splits_on_commas() {
        let q = parse(&[("careers[in]", "Business,Web Development")]).unwrap();
        assert_eq!(
            q.filter(),
            Filter::In {
                path: "careers".into(),
                values: vec!["Business".into(), "Web Development".into()],
            }
        );
    }

    #[test]
    fn control_keys_defaults() {
        let q = parse(&[]).unwrap();
        assert_eq!((q.page, q.limit, q.skip()), (1, 25, 0));
        assert_eq!(q.sort, vec![SortSpec::desc("createdAt")]);
        assert!(q.select.is_none());
        assert_eq!(q.filter(), Filter::True);
    }

    #[test]
    fn control_keys_parse_and_fall_back() {
        let q = parse(&[
            ("select", "name, careers"),
            ("sort", "-name,createdAt"),
            ("page", "3"),
            ("limit", "abc"),
        ])
        .unwrap();
        assert_eq!(q.select.clone().unwrap(), vec!["name".to_string(), "careers".to_string()]);
        assert_eq!(q.sort[0].order, Order::Desc);
        assert_eq!(q.sort[1], SortSpec::asc("createdAt"));
        assert_eq!((q.page, q.limit, q.skip()), (3, 25, 50));

        let q = parse(&[("page", "0"), ("limit", "500")]).unwrap();
        assert_eq!((q.page, q.limit), (1, 100));
    }

    #[test]
    fn last_reserved_key_wins() {
        let q = parse(&[("limit", "5"), ("limit", "7")]).unwrap();
        assert_eq!(q.limit, 7);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(parse(&[("a[foo]", "1")]), Err(QueryParseError::UnknownOperator { .. })));
        assert!(matches!(parse(&[("a[gt", "1")]), Err(QueryParseError::UnbalancedBracket(_))));
        assert!(matches!(parse(&[("a]", "1")]), Err(QueryParseError::UnbalancedBracket(_))));
        assert!(matches!(parse(&[("a[gt][lt]", "1")]), Err(QueryParseError::UnbalancedBracket(_))));
        assert!(matches!(parse(&[("[gt]", "1")]), Err(QueryParseError::EmptyField(_))));
        assert!(matches!(parse(&[("tags[in]", " , ")]), Err(QueryParseError::EmptyInList(_))));
    }

    #[test]
    fn coercion_keeps_leading_zero_strings() {
        assert_eq!(coerce_value("02118"), Bson::String("02118".into()));
        assert_eq!(coerce_value("-4"), Bson::Int64(-4));
        assert_eq!(coerce_value("8.5"), Bson::Double(8.5));
        assert_eq!(coerce_value("0.5"), Bson::Double(0.5));
        assert_eq!(coerce_value("1.2.3"), Bson::String("1.2.3".into()));
        assert_eq!(coerce_value("Boston"), Bson::String("Boston".into()));
    }
}
