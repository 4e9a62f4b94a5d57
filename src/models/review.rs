use super::fields::{Violations, get_datetime, get_f64, get_oid, get_string, to_bson_datetime};
use super::{Bootcamp, Model, find_all};
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::Filter;
use bson::oid::ObjectId;
use bson::{Document as BsonDocument, doc};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: ObjectId,
    pub title: String,
    pub text: String,
    pub rating: Option<f64>,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "super::fields::number_or_string")]
    pub rating: Option<f64>,
}

impl Review {
    #[must_use]
    pub fn new(input: ReviewInput, bootcamp: ObjectId, user: ObjectId) -> Self {
        let mut r = Self {
            id: ObjectId::new(),
            title: String::new(),
            text: String::new(),
            rating: None,
            bootcamp,
            user,
            created_at: Utc::now(),
        };
        r.apply(input);
        r
    }

    pub fn apply(&mut self, input: ReviewInput) {
        if let Some(v) = input.title {
            self.title = v.trim().to_string();
        }
        if let Some(v) = input.text {
            self.text = v;
        }
        self.rating = input.rating.or(self.rating);
    }
}

/// Recomputes `averageRating` of the bootcamp as the plain mean of its ratings.
///
/// # Errors
/// Journal failures.
pub fn refresh_average_rating(engine: &Engine, bootcamp: &ObjectId) -> Result<(), DbError> {
    let reviews: Vec<Review> = find_all(engine, &Filter::eq("bootcamp", *bootcamp))?;
    let ratings: Vec<f64> = reviews.iter().filter_map(|r| r.rating).collect();
    let avg = (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
    log::debug!("bootcamp {bootcamp}: average rating {avg:?}");
    Bootcamp::update_derived(engine, bootcamp, "averageRating", avg)
}

impl Model for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn to_document(&self) -> BsonDocument {
        let mut d = doc! {
            "_id": self.id,
            "title": self.title.as_str(),
            "text": self.text.as_str(),
        };
        if let Some(r) = self.rating {
            d.insert("rating", r);
        }
        d.insert("bootcamp", self.bootcamp);
        d.insert("user", self.user);
        d.insert("createdAt", to_bson_datetime(&self.created_at));
        d
    }

    fn from_document(d: &BsonDocument) -> Result<Self, DbError> {
        Ok(Self {
            id: get_oid(d, "_id")?,
            title: get_string(d, "title"),
            text: get_string(d, "text"),
            rating: get_f64(d, "rating"),
            bootcamp: get_oid(d, "bootcamp")?,
            user: get_oid(d, "user")?,
            created_at: get_datetime(d, "createdAt").unwrap_or_else(Utc::now),
        })
    }

    fn validate(&self) -> Result<(), DbError> {
        let mut v = Violations::default();
        v.required(&self.title, "Please add a title for the review");
        v.max_len(&self.title, 100, "Title can not be more than 100 characters");
        v.required(&self.text, "Please add some text");
        match self.rating {
            None => v.check(false, "Please add a rating between 1 and 10"),
            Some(r) => {
                v.check(r.fract() == 0.0, "Rating must be a whole number");
                v.check((1.0..=10.0).contains(&r), "Please add a rating between 1 and 10");
            }
        }
        v.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let mk = |rating| {
            Review::new(
                ReviewInput { title: Some("Great".into()), text: Some("Loved it".into()), rating },
                ObjectId::new(),
                ObjectId::new(),
            )
        };
        mk(Some(1.0)).validate().unwrap();
        mk(Some(10.0)).validate().unwrap();
        assert!(mk(Some(11.0)).validate().is_err());
        assert!(mk(Some(7.5)).validate().is_err());
        assert!(mk(None).validate().is_err());
    }

    #[test]
    fn one_review_per_user_and_bootcamp() {
        let engine = Engine::in_memory();
        super::super::register_indexes(&engine).unwrap();
        let (camp, user) = (ObjectId::new(), ObjectId::new());
        let input = || ReviewInput {
            title: Some("Great".into()),
            text: Some("Loved it".into()),
            rating: Some(8.0),
        };
        super::super::create(&engine, &Review::new(input(), camp, user)).unwrap();
        let dup = super::super::create(&engine, &Review::new(input(), camp, user));
        assert!(matches!(dup, Err(DbError::DuplicateKey { .. })));
        super::super::create(&engine, &Review::new(input(), camp, ObjectId::new())).unwrap();
    }
}
