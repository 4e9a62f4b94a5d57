//! List materialization: a parsed query string in, a paginated result envelope out.

use crate::engine::Engine;
use crate::json::document_to_json;
use crate::models::Model;
use crate::query::{Filter, FindOptions, ListQuery, count_docs, find_docs, find_one};
use bson::{Bson, Document as BsonDocument};
use serde::Serialize;
use serde_json::Value;

/// Join instruction applied to each returned record.
///
/// Without a `foreign_field` the record's `field` holds an id into `from` and is replaced
/// by that document. With one, `field` is added as the list of `from` documents whose
/// `foreign_field` equals the record's `_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    pub field: String,
    pub from: &'static str,
    pub foreign_field: Option<String>,
    pub select: Option<Vec<String>>,
}

impl Populate {
    #[must_use]
    pub fn forward(field: &str, from: &'static str) -> Self {
        Self { field: field.to_string(), from, foreign_field: None, select: None }
    }

    #[must_use]
    pub fn reverse(field: &str, from: &'static str, foreign_field: &str) -> Self {
        Self { field: field.to_string(), from, foreign_field: Some(foreign_field.to_string()), select: None }
    }

    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    /// Joins into every document of `docs` in place.
    pub fn apply(&self, engine: &Engine, docs: &mut [BsonDocument]) {
        let col = engine.create_collection(self.from);
        let opts = FindOptions { projection: self.select.clone(), ..FindOptions::default() };
        for doc in docs.iter_mut() {
            match &self.foreign_field {
                None => {
                    let joined = match doc.get(&self.field) {
                        Some(Bson::ObjectId(id)) => col.find_document(id),
                        Some(other) => find_one(&col, &Filter::eq("_id", other.clone())),
                        None => continue,
                    };
                    let joined = joined.map(|d| match &self.select {
                        Some(fields) => crate::query::project_fields(&d, fields),
                        None => d,
                    });
                    // a dangling reference renders as null
                    doc.insert(self.field.clone(), joined.map_or(Bson::Null, Bson::Document));
                }
                Some(foreign) => {
                    let Some(id) = doc.get("_id").cloned() else { continue };
                    let related = find_docs(&col, &Filter::eq(foreign.as_str(), id), &opts);
                    doc.insert(
                        self.field.clone(),
                        related.into_iter().map(Bson::Document).collect::<Vec<_>>(),
                    );
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
}

impl Pagination {
    #[must_use]
    pub fn compute(page: usize, limit: usize, total: usize) -> Self {
        Self {
            prev: (page > 1).then_some(PageRef { page: page - 1, limit }),
            next: (page.saturating_mul(limit) < total).then_some(PageRef { page: page + 1, limit }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub count: usize,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

/// JSON form of a stored document without the fields in `hidden`.
#[must_use]
pub fn render(doc: &BsonDocument, hidden: &[&str]) -> Value {
    if hidden.iter().any(|h| doc.contains_key(h)) {
        let mut doc = doc.clone();
        for h in hidden {
            doc.remove(h);
        }
        document_to_json(&doc)
    } else {
        document_to_json(doc)
    }
}

/// Filters, counts, sorts, pages, projects and joins one collection per `query`.
#[must_use]
pub fn materialize<M: Model>(
    engine: &Engine,
    populate: Option<&Populate>,
    query: &ListQuery,
) -> ResultEnvelope {
    let col = engine.create_collection(M::COLLECTION);
    let filter = query.filter();
    let total = count_docs(&col, &filter);
    let mut docs = find_docs(&col, &filter, &query.find_options());
    if let Some(p) = populate
        && query.selects(&p.field)
    {
        p.apply(engine, &mut docs);
    }
    log::debug!(
        "{}: page {} limit {} returned {} of {total}",
        M::COLLECTION,
        query.page,
        query.limit,
        docs.len()
    );
    ResultEnvelope {
        success: true,
        count: docs.len(),
        pagination: Pagination::compute(query.page, query.limit, total),
        data: docs.iter().map(|d| render(d, M::HIDDEN)).collect(),
    }
}
