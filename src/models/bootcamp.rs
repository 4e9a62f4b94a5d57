use super::fields::{
    Violations, get_bool, get_datetime, get_f64, get_oid, get_opt_string, get_string, get_strings,
    insert_opt, is_email, is_url, slugify, to_bson_datetime,
};
use super::{Course, Model, Review};
use crate::engine::Engine;
use crate::errors::DbError;
use crate::geo::{GeoPoint, Geocoder};
use crate::query::Filter;
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument, doc};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const CAREERS: [&str; 6] =
    ["Web Development", "Mobile Development", "UI/UX", "Data Science", "Business", "Other"];
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Clone, PartialEq)]
pub struct Bootcamp {
    pub id: ObjectId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub user: ObjectId,
    pub created_at: DateTime<Utc>,
}

/// Client-writable bootcamp fields. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl Bootcamp {
    #[must_use]
    pub fn new(input: BootcampInput, user: ObjectId) -> Self {
        let mut b = Self {
            id: ObjectId::new(),
            name: String::new(),
            slug: String::new(),
            description: String::new(),
            website: None,
            phone: None,
            email: None,
            address: String::new(),
            location: None,
            careers: Vec::new(),
            average_rating: None,
            average_cost: None,
            photo: DEFAULT_PHOTO.to_string(),
            housing: false,
            job_assistance: false,
            job_guarantee: false,
            accept_gi: false,
            user,
            created_at: Utc::now(),
        };
        b.apply(input);
        b
    }

    /// Merges `input` into the record. Returns `true` when the address changed.
    pub fn apply(&mut self, input: BootcampInput) -> bool {
        if let Some(name) = input.name {
            self.name = name.trim().to_string();
            self.slug = slugify(&self.name);
        }
        if let Some(v) = input.description {
            self.description = v;
        }
        let mut moved = false;
        if let Some(v) = input.address
            && v != self.address
        {
            self.address = v;
            moved = true;
        }
        self.website = input.website.or(self.website.take());
        self.phone = input.phone.or(self.phone.take());
        self.email = input.email.or(self.email.take());
        if let Some(v) = input.careers {
            self.careers = v;
        }
        self.housing = input.housing.unwrap_or(self.housing);
        self.job_assistance = input.job_assistance.unwrap_or(self.job_assistance);
        self.job_guarantee = input.job_guarantee.unwrap_or(self.job_guarantee);
        self.accept_gi = input.accept_gi.unwrap_or(self.accept_gi);
        moved
    }

    /// Resolves `location` from the address. Unresolvable addresses clear it.
    pub fn locate(&mut self, geocoder: &dyn Geocoder) {
        self.location = geocoder.geocode(&self.address);
        if self.location.is_none() && !self.address.trim().is_empty() {
            log::warn!("bootcamp {}: could not geocode address '{}'", self.id, self.address);
        }
    }

    /// Sets or clears a derived aggregate without re-running validation.
    ///
    /// # Errors
    /// Journal failures.
    pub fn update_derived(
        engine: &Engine,
        id: &ObjectId,
        field: &str,
        value: Option<f64>,
    ) -> Result<(), DbError> {
        let col = engine.create_collection(Self::COLLECTION);
        let Some(mut stored) = col.find_document(id) else {
            return Ok(());
        };
        match value {
            Some(v) => {
                stored.insert(field, v);
            }
            None => {
                stored.remove(field);
            }
        }
        col.update_document(id, stored)?;
        Ok(())
    }

    /// Deletes the bootcamp together with its courses and reviews.
    ///
    /// # Errors
    /// Journal failures.
    pub fn delete_cascade(engine: &Engine, id: &ObjectId) -> Result<Option<Self>, DbError> {
        let owned = Filter::eq("bootcamp", *id);
        for name in [Course::COLLECTION, Review::COLLECTION] {
            let col = engine.create_collection(name);
            let children: Vec<ObjectId> =
                crate::query::find_docs(&col, &owned, &crate::query::FindOptions::default())
                    .iter()
                    .filter_map(|d| d.get_object_id("_id").ok())
                    .collect();
            for child in &children {
                col.delete_document(child)?;
            }
            if !children.is_empty() {
                log::info!("bootcamp {id}: removed {} {name}", children.len());
            }
        }
        super::remove::<Self>(engine, id)
    }
}

impl Model for Bootcamp {
    const COLLECTION: &'static str = "bootcamps";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn to_document(&self) -> BsonDocument {
        let mut d = doc! {
            "_id": self.id,
            "name": self.name.as_str(),
            "slug": self.slug.as_str(),
            "description": self.description.as_str(),
        };
        insert_opt(&mut d, "website", self.website.as_deref());
        insert_opt(&mut d, "phone", self.phone.as_deref());
        insert_opt(&mut d, "email", self.email.as_deref());
        d.insert("address", self.address.as_str());
        insert_opt(&mut d, "location", self.location.as_ref().map(GeoPoint::to_document));
        d.insert(
            "careers",
            self.careers.iter().map(|c| Bson::String(c.clone())).collect::<Vec<_>>(),
        );
        insert_opt(&mut d, "averageRating", self.average_rating);
        insert_opt(&mut d, "averageCost", self.average_cost);
        d.insert("photo", self.photo.as_str());
        d.insert("housing", self.housing);
        d.insert("jobAssistance", self.job_assistance);
        d.insert("jobGuarantee", self.job_guarantee);
        d.insert("acceptGi", self.accept_gi);
        d.insert("user", self.user);
        d.insert("createdAt", to_bson_datetime(&self.created_at));
        d
    }

    fn from_document(d: &BsonDocument) -> Result<Self, DbError> {
        Ok(Self {
            id: get_oid(d, "_id")?,
            name: get_string(d, "name"),
            slug: get_string(d, "slug"),
            description: get_string(d, "description"),
            website: get_opt_string(d, "website"),
            phone: get_opt_string(d, "phone"),
            email: get_opt_string(d, "email"),
            address: get_string(d, "address"),
            location: d.get_document("location").ok().and_then(GeoPoint::from_document),
            careers: get_strings(d, "careers"),
            average_rating: get_f64(d, "averageRating"),
            average_cost: get_f64(d, "averageCost"),
            photo: get_opt_string(d, "photo").unwrap_or_else(|| DEFAULT_PHOTO.to_string()),
            housing: get_bool(d, "housing"),
            job_assistance: get_bool(d, "jobAssistance"),
            job_guarantee: get_bool(d, "jobGuarantee"),
            accept_gi: get_bool(d, "acceptGi"),
            user: get_oid(d, "user")?,
            created_at: get_datetime(d, "createdAt").unwrap_or_else(Utc::now),
        })
    }

    fn validate(&self) -> Result<(), DbError> {
        let mut v = Violations::default();
        v.required(&self.name, "Please add a name");
        v.max_len(&self.name, 50, "Name can not be more than 50 characters");
        v.required(&self.description, "Please add a description");
        v.max_len(&self.description, 500, "Description can not be more than 500 characters");
        if let Some(w) = &self.website {
            v.check(is_url(w), "Please use a valid URL with HTTP or HTTPS");
        }
        if let Some(p) = &self.phone {
            v.max_len(p, 20, "Phone number can not be longer than 20 characters");
        }
        if let Some(e) = &self.email {
            v.check(is_email(e), "Please add a valid email");
        }
        v.required(&self.address, "Please add an address");
        v.check(!self.careers.is_empty(), "Please add at least one career");
        for c in &self.careers {
            v.check(CAREERS.contains(&c.as_str()), format!("`{c}` is not a valid career"));
        }
        if let Some(r) = self.average_rating {
            v.check(r >= 1.0, "Rating must be at least 1");
            v.check(r <= 10.0, "Rating can not be more than 10");
        }
        v.into_result()
    }
}
