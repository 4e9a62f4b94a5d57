use super::fields::{
    Violations, get_bool, get_datetime, get_f64, get_oid, get_string, number_or_string,
    string_or_number, to_bson_datetime,
};
use super::{Bootcamp, Model, find_all};
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::Filter;
use bson::oid::ObjectId;
use bson::{Document as BsonDocument, doc};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: Option<f64>,
    pub minimum_skill: String,
    pub scholarship_available: bool,
    pub bootcamp: ObjectId,
    pub user: ObjectId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weeks: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarship_available: Option<bool>,
}

impl Course {
    #[must_use]
    pub fn new(input: CourseInput, bootcamp: ObjectId, user: ObjectId) -> Self {
        let mut c = Self {
            id: ObjectId::new(),
            title: String::new(),
            description: String::new(),
            weeks: String::new(),
            tuition: None,
            minimum_skill: String::new(),
            scholarship_available: false,
            bootcamp,
            user,
            created_at: Utc::now(),
        };
        c.apply(input);
        c
    }

    pub fn apply(&mut self, input: CourseInput) {
        if let Some(v) = input.title {
            self.title = v.trim().to_string();
        }
        if let Some(v) = input.description {
            self.description = v;
        }
        if let Some(v) = input.weeks {
            self.weeks = v;
        }
        self.tuition = input.tuition.or(self.tuition);
        if let Some(v) = input.minimum_skill {
            self.minimum_skill = v;
        }
        self.scholarship_available = input.scholarship_available.unwrap_or(self.scholarship_available);
    }
}

/// Mean tuition rounded up to the next multiple of ten.
#[must_use]
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    if tuitions.is_empty() {
        return None;
    }
    let avg = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    Some((avg / 10.0).ceil() * 10.0)
}

/// Recomputes `averageCost` of the bootcamp from its remaining courses.
///
/// # Errors
/// Journal failures.
pub fn refresh_average_cost(engine: &Engine, bootcamp: &ObjectId) -> Result<(), DbError> {
    let courses: Vec<Course> = find_all(engine, &Filter::eq("bootcamp", *bootcamp))?;
    let tuitions: Vec<f64> = courses.iter().filter_map(|c| c.tuition).collect();
    let cost = average_cost(&tuitions);
    log::debug!("bootcamp {bootcamp}: average cost {cost:?}");
    Bootcamp::update_derived(engine, bootcamp, "averageCost", cost)
}

impl Model for Course {
    const COLLECTION: &'static str = "courses";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn to_document(&self) -> BsonDocument {
        let mut d = doc! {
            "_id": self.id,
            "title": self.title.as_str(),
            "description": self.description.as_str(),
            "weeks": self.weeks.as_str(),
        };
        if let Some(t) = self.tuition {
            d.insert("tuition", t);
        }
        d.insert("minimumSkill", self.minimum_skill.as_str());
        d.insert("scholarshipAvailable", self.scholarship_available);
        d.insert("bootcamp", self.bootcamp);
        d.insert("user", self.user);
        d.insert("createdAt", to_bson_datetime(&self.created_at));
        d
    }

    fn from_document(d: &BsonDocument) -> Result<Self, DbError> {
        Ok(Self {
            id: get_oid(d, "_id")?,
            title: get_string(d, "title"),
            description: get_string(d, "description"),
            weeks: get_string(d, "weeks"),
            tuition: get_f64(d, "tuition"),
            minimum_skill: get_string(d, "minimumSkill"),
            scholarship_available: get_bool(d, "scholarshipAvailable"),
            bootcamp: get_oid(d, "bootcamp")?,
            user: get_oid(d, "user")?,
            created_at: get_datetime(d, "createdAt").unwrap_or_else(Utc::now),
        })
    }

    fn validate(&self) -> Result<(), DbError> {
        let mut v = Violations::default();
        v.required(&self.title, "Please add a course title");
        v.required(&self.description, "Please add a description");
        v.required(&self.weeks, "Please add number of weeks");
        v.check(self.tuition.is_some(), "Please add amount of tuition");
        if let Some(t) = self.tuition {
            v.check(t >= 0.0, "Tuition can not be negative");
        }
        if self.minimum_skill.is_empty() {
            v.check(false, "Please add a minimum skill");
        } else {
            v.check(
                SKILLS.contains(&self.minimum_skill.as_str()),
                format!("`{}` is not a valid minimum skill", self.minimum_skill),
            );
        }
        v.into_result()
    }
}
