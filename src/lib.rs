//! DevCamper: a bootcamp directory REST API over an embedded, journaled BSON document store.
//!
//! Layers, bottom up: the store ([`engine`], [`collection`], [`journal`], [`index`]), the
//! query engine ([`query`]), typed models ([`models`]), the list materializer
//! ([`results`]), credentials ([`auth`]) and the HTTP surface ([`api`]).

pub mod api;
pub mod auth;
pub mod collection;
pub mod config;
pub mod engine;
pub mod errors;
pub mod geo;
pub mod index;
pub mod journal;
pub mod json;
pub mod logger;
pub mod mail;
pub mod models;
pub mod query;
pub mod results;
pub mod seeder;
pub mod state;
pub mod types;

pub use api::{router, serve};
pub use config::AppConfig;
pub use engine::Engine;
pub use errors::DbError;
pub use state::{AppState, SharedState};
