use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Document not found: {0}")]
    NoSuchDocument(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("Duplicate field value entered: {fields} = {value}")]
    DuplicateKey { fields: String, value: String },

    #[error("{}", .0.join(","))]
    Validation(Vec<String>),

    #[error("Journal error: {0}")]
    JournalError(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

impl DbError {
    /// Single-message validation failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_joins_all_messages() {
        let e = DbError::Validation(vec!["Please add a name".into(), "Please add an address".into()]);
        assert_eq!(e.to_string(), "Please add a name,Please add an address");
    }

    #[test]
    fn duplicate_key_names_field() {
        let e = DbError::DuplicateKey { fields: "email".into(), value: "\"a@b.io\"".into() };
        assert_eq!(e.to_string(), "Duplicate field value entered: email = \"a@b.io\"");
    }
}
