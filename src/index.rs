use crate::errors::DbError;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKeyKind {
    Str(String),
    F64(OrderedFloat<f64>),
    I64(i64),
    Bool(bool),
    Oid([u8; 12]),
}

#[must_use]
pub fn key_from_bson(v: &Bson) -> Option<IndexKeyKind> {
    match v {
        Bson::String(s) => Some(IndexKeyKind::Str(s.clone())),
        Bson::Int32(i) => Some(IndexKeyKind::I64(i64::from(*i))),
        Bson::Int64(i) => Some(IndexKeyKind::I64(*i)),
        Bson::Double(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Some(IndexKeyKind::I64(*f as i64))
        }
        Bson::Double(f) => Some(IndexKeyKind::F64(OrderedFloat(*f))),
        Bson::Boolean(b) => Some(IndexKeyKind::Bool(*b)),
        Bson::ObjectId(oid) => Some(IndexKeyKind::Oid(oid.bytes())),
        _ => None,
    }
}

/// Unique constraint over one or more top-level fields. Documents missing any of the
/// fields are not indexed (sparse).
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    pub fields: Vec<String>,
    map: HashMap<Vec<IndexKeyKind>, DocumentId>,
}

impl UniqueIndex {
    #[must_use]
    pub fn new(fields: &[&str]) -> Self {
        Self { fields: fields.iter().map(|f| (*f).to_string()).collect(), map: HashMap::new() }
    }

    fn key(&self, doc: &BsonDocument) -> Option<Vec<IndexKeyKind>> {
        self.fields.iter().map(|f| doc.get(f).and_then(key_from_bson)).collect()
    }

    fn violation(&self, doc: &BsonDocument) -> DbError {
        let value = self
            .fields
            .iter()
            .map(|f| doc.get(f).map_or_else(|| "null".to_string(), ToString::to_string))
            .collect::<Vec<_>>()
            .join(", ");
        DbError::DuplicateKey { fields: self.fields.join(", "), value }
    }

    /// Fails if another document already holds the key of `doc`.
    pub fn check(&self, doc: &BsonDocument, id: &DocumentId) -> Result<(), DbError> {
        if let Some(k) = self.key(doc)
            && let Some(holder) = self.map.get(&k)
            && holder != id
        {
            return Err(self.violation(doc));
        }
        Ok(())
    }

    pub fn insert(&mut self, doc: &BsonDocument, id: &DocumentId) -> Result<(), DbError> {
        self.check(doc, id)?;
        if let Some(k) = self.key(doc) {
            self.map.insert(k, *id);
        }
        Ok(())
    }

    pub fn remove(&mut self, doc: &BsonDocument, id: &DocumentId) {
        if let Some(k) = self.key(doc)
            && self.map.get(&k) == Some(id)
        {
            self.map.remove(&k);
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }
}
