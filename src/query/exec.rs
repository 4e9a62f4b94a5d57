use crate::collection::Collection;
use bson::Document as BsonDocument;
use std::time::Instant;

use super::eval::{compare_docs, eval_filter, project_fields};
use super::types::{Filter, FindOptions, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS};

/// Matching documents after sort, the skip/limit window, and projection.
pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Vec<BsonDocument> {
    let start = Instant::now();
    let mut docs: Vec<BsonDocument> =
        col.get_all_documents().into_iter().filter(|d| eval_filter(d, filter)).collect();
    let matched = docs.len();

    if let Some(sort) = &opts.sort {
        if sort.len() > MAX_SORT_FIELDS {
            log::warn!("sort spec too long: {}", sort.len());
        }
        // stable: ties keep id (creation) order
        docs.sort_by(|a, b| compare_docs(a, b, sort));
    }

    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX);
    let mut docs: Vec<BsonDocument> = docs.into_iter().skip(skip).take(limit).collect();

    if let Some(fields) = &opts.projection {
        let fields: Vec<String> = fields.iter().take(MAX_PROJECTION_FIELDS).cloned().collect();
        for d in &mut docs {
            *d = project_fields(d, &fields);
        }
    }

    log::debug!(
        target: "devcamper::query",
        "{{\"op\":\"find\",\"collection\":\"{}\",\"duration_us\":{},\"matched\":{},\"returned\":{},\"skip\":{},\"limit\":{}}}",
        col.name(),
        start.elapsed().as_micros(),
        matched,
        docs.len(),
        skip,
        opts.limit.unwrap_or(0)
    );
    docs
}

/// First matching document in id order.
pub fn find_one(col: &Collection, filter: &Filter) -> Option<BsonDocument> {
    col.get_all_documents().into_iter().find(|d| eval_filter(d, filter))
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    let start = Instant::now();
    let n = col.get_all_documents().iter().filter(|d| eval_filter(d, filter)).count();
    log::debug!(
        target: "devcamper::query",
        "{{\"op\":\"count\",\"collection\":\"{}\",\"duration_us\":{},\"result_count\":{}}}",
        col.name(),
        start.elapsed().as_micros(),
        n
    );
    n
}
