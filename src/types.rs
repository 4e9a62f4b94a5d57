use bson::Document as BsonDocument;
use bson::oid::ObjectId;

pub type CollectionName = String;
pub type DocumentId = ObjectId;

/// Represents operations recorded in the journal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert { collection: CollectionName, document: BsonDocument },
    Update { collection: CollectionName, document_id: DocumentId, new_document: BsonDocument },
    Delete { collection: CollectionName, document_id: DocumentId },
    Clear { collection: CollectionName },
}

impl Operation {
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Insert { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. }
            | Self::Clear { collection } => collection,
        }
    }
}
