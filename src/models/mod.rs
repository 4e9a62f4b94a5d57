//! Typed records over the document store.
//!
//! Each model maps to one collection and converts to and from BSON by hand. Writes run
//! the model's validation over the whole record first, so updates and creates share the
//! same rules.

pub mod bootcamp;
pub mod course;
pub mod fields;
pub mod review;
pub mod user;

pub use bootcamp::{Bootcamp, BootcampInput};
pub use course::{Course, CourseInput};
pub use review::{Review, ReviewInput};
pub use user::{Role, User, UserInput};

use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::{Filter, FindOptions, SortSpec, find_docs, find_one as find_one_doc};
use bson::Document as BsonDocument;
use bson::oid::ObjectId;

pub trait Model: Sized {
    const COLLECTION: &'static str;
    /// Fields never rendered in responses.
    const HIDDEN: &'static [&'static str] = &[];

    fn id(&self) -> ObjectId;
    fn to_document(&self) -> BsonDocument;

    /// # Errors
    /// Fails when a required stored field is missing or mistyped.
    fn from_document(doc: &BsonDocument) -> Result<Self, DbError>;

    /// # Errors
    /// `DbError::Validation` listing every violated rule.
    fn validate(&self) -> Result<(), DbError>;
}

/// Parses a 24-char hex id.
///
/// # Errors
/// `DbError::InvalidDocumentId` for anything else.
pub fn parse_id(raw: &str) -> Result<ObjectId, DbError> {
    ObjectId::parse_str(raw).map_err(|_| DbError::InvalidDocumentId(raw.to_string()))
}

/// Declares the unique constraints of every model collection.
///
/// # Errors
/// Fails when stored data already violates a constraint.
pub fn register_indexes(engine: &Engine) -> Result<(), DbError> {
    engine.create_collection(Bootcamp::COLLECTION).ensure_unique_index(&["name"])?;
    engine.create_collection(Course::COLLECTION);
    engine.create_collection(Review::COLLECTION).ensure_unique_index(&["bootcamp", "user"])?;
    engine.create_collection(User::COLLECTION).ensure_unique_index(&["email"])?;
    Ok(())
}

/// # Errors
/// Fails when the stored document cannot be decoded.
pub fn find_by_id<M: Model>(engine: &Engine, id: &ObjectId) -> Result<Option<M>, DbError> {
    engine.create_collection(M::COLLECTION).find_document(id).as_ref().map(M::from_document).transpose()
}

/// # Errors
/// Fails when the stored document cannot be decoded.
pub fn find_one<M: Model>(engine: &Engine, filter: &Filter) -> Result<Option<M>, DbError> {
    find_one_doc(&engine.create_collection(M::COLLECTION), filter)
        .as_ref()
        .map(M::from_document)
        .transpose()
}

/// All matches in creation order.
///
/// # Errors
/// Fails when a stored document cannot be decoded.
pub fn find_all<M: Model>(engine: &Engine, filter: &Filter) -> Result<Vec<M>, DbError> {
    let opts = FindOptions { sort: Some(vec![SortSpec::asc("createdAt")]), ..FindOptions::default() };
    find_docs(&engine.create_collection(M::COLLECTION), filter, &opts)
        .iter()
        .map(M::from_document)
        .collect()
}

/// Validates and inserts a new record.
///
/// # Errors
/// Validation, unique-constraint or journal failures.
pub fn create<M: Model>(engine: &Engine, model: &M) -> Result<(), DbError> {
    model.validate()?;
    engine.create_collection(M::COLLECTION).insert_document(model.to_document())?;
    log::debug!("{}: created {}", M::COLLECTION, model.id());
    Ok(())
}

/// Validates and replaces an existing record.
///
/// # Errors
/// Validation, unique-constraint or journal failures; `NoSuchDocument` when it is gone.
pub fn save<M: Model>(engine: &Engine, model: &M) -> Result<(), DbError> {
    model.validate()?;
    let id = model.id();
    if !engine.create_collection(M::COLLECTION).update_document(&id, model.to_document())? {
        return Err(DbError::NoSuchDocument(id.to_hex()));
    }
    Ok(())
}

/// Removes a record, returning it if it existed.
///
/// # Errors
/// Journal failures or an undecodable stored document.
pub fn remove<M: Model>(engine: &Engine, id: &ObjectId) -> Result<Option<M>, DbError> {
    engine.create_collection(M::COLLECTION).delete_document(id)?.as_ref().map(M::from_document).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_invalid() {
        assert!(matches!(parse_id("123"), Err(DbError::InvalidDocumentId(_))));
        assert!(parse_id("5d713995b721c3bb38c1f5d0").is_ok());
    }
}
