use crate::collection::Collection;
use crate::errors::DbError;
use crate::journal::{Journal, MemoryStorage, StorageEngine};
use crate::types::CollectionName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub const JOURNAL_FILE: &str = "devcamper.journal";

/// The embedded document store: named collections sharing one storage sink.
pub struct Engine {
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
    storage: Arc<dyn StorageEngine>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("collections", &self.list_collection_names()).finish()
    }
}

impl Engine {
    /// An engine that keeps everything in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self { collections: RwLock::new(HashMap::new()), storage: Arc::new(MemoryStorage) }
    }

    /// Opens the journal in `data_dir` and rebuilds the collections from it.
    ///
    /// # Errors
    /// Returns an error if the directory or journal cannot be opened.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DbError> {
        let path = data_dir.as_ref().join(JOURNAL_FILE);
        let (journal, ops) = Journal::open(&path)?;
        let engine =
            Self { collections: RwLock::new(HashMap::new()), storage: Arc::new(journal) };
        for op in ops {
            engine.create_collection(op.collection()).replay(op);
        }
        Ok(engine)
    }

    /// Returns the named collection, creating it if needed.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        if let Some(col) = self.collections.read().get(name) {
            return col.clone();
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name, self.storage.clone())))
            .clone()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Forces buffered journal writes to disk.
    ///
    /// # Errors
    /// Returns the underlying I/O failure.
    pub fn flush(&self) -> Result<(), DbError> {
        self.storage.flush()
    }
}
