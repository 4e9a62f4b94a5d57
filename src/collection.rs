use crate::errors::DbError;
use crate::index::UniqueIndex;
use crate::journal::StorageEngine;
use crate::types::{DocumentId, Operation};
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named set of BSON documents keyed by `_id`.
///
/// Iteration follows `ObjectId` order, which is creation order for generated ids.
pub struct Collection {
    name: String,
    docs: RwLock<BTreeMap<DocumentId, BsonDocument>>,
    unique: RwLock<Vec<UniqueIndex>>,
    storage: Arc<dyn StorageEngine>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).field("len", &self.len()).finish()
    }
}

fn document_id(doc: &BsonDocument) -> Result<DocumentId, DbError> {
    match doc.get("_id") {
        Some(Bson::ObjectId(id)) => Ok(*id),
        Some(other) => Err(DbError::InvalidDocumentId(other.to_string())),
        None => Err(DbError::InvalidDocumentId("missing _id".into())),
    }
}

impl Collection {
    pub fn new(name: impl Into<String>, storage: Arc<dyn StorageEngine>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(BTreeMap::new()),
            unique: RwLock::new(Vec::new()),
            storage,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Declares a unique constraint and indexes the documents already present.
    ///
    /// # Errors
    /// Returns `DuplicateKey` when existing documents already violate the constraint.
    pub fn ensure_unique_index(&self, fields: &[&str]) -> Result<(), DbError> {
        let docs = self.docs.read();
        let mut unique = self.unique.write();
        if unique.iter().any(|idx| idx.fields.iter().map(String::as_str).eq(fields.iter().copied())) {
            return Ok(());
        }
        let mut idx = UniqueIndex::new(fields);
        for (id, doc) in docs.iter() {
            idx.insert(doc, id)?;
        }
        unique.push(idx);
        Ok(())
    }

    /// Inserts a document, generating `_id` when absent.
    ///
    /// # Errors
    /// Fails on unique-constraint violations, an id already present, or journal errors.
    pub fn insert_document(&self, mut document: BsonDocument) -> Result<DocumentId, DbError> {
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        let id = document_id(&document)?;
        let mut docs = self.docs.write();
        if docs.contains_key(&id) {
            return Err(DbError::DuplicateKey { fields: "_id".into(), value: id.to_hex() });
        }
        let mut unique = self.unique.write();
        for idx in unique.iter() {
            idx.check(&document, &id)?;
        }
        self.storage
            .append(&Operation::Insert { collection: self.name.clone(), document: document.clone() })?;
        for idx in unique.iter_mut() {
            idx.insert(&document, &id)?;
        }
        docs.insert(id, document);
        Ok(id)
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<BsonDocument> {
        self.docs.read().get(id).cloned()
    }

    /// Replaces the stored document with `new_document`; `_id` is forced to `id`.
    /// Returns `false` when no such document exists.
    ///
    /// # Errors
    /// Fails on unique-constraint violations or journal errors.
    pub fn update_document(
        &self,
        id: &DocumentId,
        mut new_document: BsonDocument,
    ) -> Result<bool, DbError> {
        new_document.insert("_id", *id);
        let mut docs = self.docs.write();
        let Some(old) = docs.get(id) else {
            return Ok(false);
        };
        let mut unique = self.unique.write();
        for idx in unique.iter() {
            idx.check(&new_document, id)?;
        }
        self.storage.append(&Operation::Update {
            collection: self.name.clone(),
            document_id: *id,
            new_document: new_document.clone(),
        })?;
        for idx in unique.iter_mut() {
            idx.remove(old, id);
            idx.insert(&new_document, id)?;
        }
        docs.insert(*id, new_document);
        Ok(true)
    }

    /// Removes a document, returning it if it existed.
    ///
    /// # Errors
    /// Fails when the journal cannot record the delete.
    pub fn delete_document(&self, id: &DocumentId) -> Result<Option<BsonDocument>, DbError> {
        let mut docs = self.docs.write();
        if !docs.contains_key(id) {
            return Ok(None);
        }
        self.storage
            .append(&Operation::Delete { collection: self.name.clone(), document_id: *id })?;
        let removed = docs.remove(id);
        if let Some(doc) = &removed {
            for idx in self.unique.write().iter_mut() {
                idx.remove(doc, id);
            }
        }
        Ok(removed)
    }

    /// Removes every document. Returns how many were removed.
    ///
    /// # Errors
    /// Fails when the journal cannot record the clear.
    pub fn clear(&self) -> Result<usize, DbError> {
        let mut docs = self.docs.write();
        self.storage.append(&Operation::Clear { collection: self.name.clone() })?;
        let n = docs.len();
        docs.clear();
        for idx in self.unique.write().iter_mut() {
            idx.clear();
        }
        Ok(n)
    }

    /// Clones all documents in id order.
    #[must_use]
    pub fn get_all_documents(&self) -> Vec<BsonDocument> {
        self.docs.read().values().cloned().collect()
    }

    /// Applies a journaled operation without re-recording it.
    pub(crate) fn replay(&self, op: Operation) {
        let mut docs = self.docs.write();
        match op {
            Operation::Insert { document, .. } => {
                if let Ok(id) = document_id(&document) {
                    docs.insert(id, document);
                }
            }
            Operation::Update { document_id, new_document, .. } => {
                docs.insert(document_id, new_document);
            }
            Operation::Delete { document_id, .. } => {
                docs.remove(&document_id);
            }
            Operation::Clear { .. } => docs.clear(),
        }
    }
}
