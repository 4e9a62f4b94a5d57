//! Bulk import from JSON fixture files and bulk removal.
//!
//! Records go through the model layer, so passwords are hashed, slugs derived, bootcamps
//! geocoded and averages recomputed exactly as if they had been created over HTTP. Each
//! fixture may carry its own `_id` so cross references between files stay stable.

use crate::auth::AuthError;
use crate::auth::password::hash_password;
use crate::errors::DbError;
use crate::models::course::refresh_average_cost;
use crate::models::review::refresh_average_rating;
use crate::models::{
    self, Bootcamp, BootcampInput, Course, CourseInput, Model, Review, ReviewInput, User, UserInput,
};
use crate::state::AppState;
use bson::oid::ObjectId;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const USERS_FILE: &str = "users.json";
pub const BOOTCAMPS_FILE: &str = "bootcamps.json";
pub const COURSES_FILE: &str = "courses.json";
pub const REVIEWS_FILE: &str = "reviews.json";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("parsing {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Debug, Deserialize)]
struct UserSeed {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(flatten)]
    input: UserInput,
}

#[derive(Debug, Deserialize)]
struct BootcampSeed {
    #[serde(rename = "_id")]
    id: Option<String>,
    user: String,
    #[serde(flatten)]
    input: BootcampInput,
}

#[derive(Debug, Deserialize)]
struct CourseSeed {
    #[serde(rename = "_id")]
    id: Option<String>,
    bootcamp: String,
    user: String,
    #[serde(flatten)]
    input: CourseInput,
}

#[derive(Debug, Deserialize)]
struct ReviewSeed {
    #[serde(rename = "_id")]
    id: Option<String>,
    bootcamp: String,
    user: String,
    #[serde(flatten)]
    input: ReviewInput,
}

/// Records inserted per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub bootcamps: usize,
    pub courses: usize,
    pub reviews: usize,
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} users, {} bootcamps, {} courses, {} reviews",
            self.users, self.bootcamps, self.courses, self.reviews
        )
    }
}

/// Reads `dir/<file>` if it exists.
fn read_seed<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, SeedError> {
    let path = dir.join(file);
    if !path.exists() {
        log::debug!("seed: {} not present, skipping", path.display());
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).map_err(|source| SeedError::Io { path: path.clone(), source })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Json { path, source })
}

fn seed_id(raw: Option<&str>) -> Result<ObjectId, DbError> {
    raw.map_or_else(|| Ok(ObjectId::new()), models::parse_id)
}

/// Imports users, then bootcamps, courses and reviews from `dir`.
///
/// # Errors
/// Unreadable or malformed fixtures, invalid records, duplicate keys and journal failures.
/// Records inserted before the failure stay in place.
pub fn import(state: &AppState, dir: &Path) -> Result<SeedReport, SeedError> {
    let engine = &state.engine;
    let mut report = SeedReport::default();

    for seed in read_seed::<UserSeed>(dir, USERS_FILE)? {
        let role = seed.input.check_new(true)?;
        let hash = hash_password(seed.input.password.as_deref().unwrap_or_default())?;
        let mut user = User::new(&seed.input, role, hash);
        user.id = seed_id(seed.id.as_deref())?;
        models::create(engine, &user)?;
        report.users += 1;
    }

    for seed in read_seed::<BootcampSeed>(dir, BOOTCAMPS_FILE)? {
        let mut bootcamp = Bootcamp::new(seed.input, models::parse_id(&seed.user)?);
        bootcamp.id = seed_id(seed.id.as_deref())?;
        bootcamp.locate(state.geocoder.as_ref());
        models::create(engine, &bootcamp)?;
        report.bootcamps += 1;
    }

    let mut touched = BTreeSet::new();
    for seed in read_seed::<CourseSeed>(dir, COURSES_FILE)? {
        let bootcamp = models::parse_id(&seed.bootcamp)?;
        let mut course = Course::new(seed.input, bootcamp, models::parse_id(&seed.user)?);
        course.id = seed_id(seed.id.as_deref())?;
        models::create(engine, &course)?;
        touched.insert(bootcamp);
        report.courses += 1;
    }
    for bootcamp in &touched {
        refresh_average_cost(engine, bootcamp)?;
    }

    touched.clear();
    for seed in read_seed::<ReviewSeed>(dir, REVIEWS_FILE)? {
        let bootcamp = models::parse_id(&seed.bootcamp)?;
        let mut review = Review::new(seed.input, bootcamp, models::parse_id(&seed.user)?);
        review.id = seed_id(seed.id.as_deref())?;
        models::create(engine, &review)?;
        touched.insert(bootcamp);
        report.reviews += 1;
    }
    for bootcamp in &touched {
        refresh_average_rating(engine, bootcamp)?;
    }

    log::info!("seed import from {}: {report}", dir.display());
    Ok(report)
}

/// Clears the four model collections. Returns how many documents were removed.
///
/// # Errors
/// Journal failures.
pub fn destroy(state: &AppState) -> Result<usize, DbError> {
    let mut removed = 0;
    for name in [Review::COLLECTION, Course::COLLECTION, Bootcamp::COLLECTION, User::COLLECTION] {
        removed += state.engine.create_collection(name).clear()?;
    }
    log::info!("seed destroy: removed {removed} documents");
    Ok(removed)
}
