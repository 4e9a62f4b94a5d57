use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::geo::{Geocoder, StaticGeocoder};
use crate::mail::{LogMailer, Mailer};
use crate::query::PageDefaults;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything a request handler needs, shared across requests.
pub struct AppState {
    pub engine: Engine,
    pub config: AppConfig,
    pub tokens: TokenIssuer,
    pub geocoder: Box<dyn Geocoder>,
    pub mailer: Box<dyn Mailer>,
    /// Held across the one-bootcamp-per-publisher check and the insert.
    pub publish_lock: Mutex<()>,
}

pub type SharedState = Arc<AppState>;

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("engine", &self.engine).field("config", &self.config).finish()
    }
}

impl AppState {
    /// Assembles state around an already opened engine and declares its indexes.
    ///
    /// # Errors
    /// Fails when stored data violates a unique index.
    pub fn new(
        engine: Engine,
        config: AppConfig,
        geocoder: Box<dyn Geocoder>,
        mailer: Box<dyn Mailer>,
    ) -> Result<Self, DbError> {
        crate::models::register_indexes(&engine)?;
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_expire_days);
        Ok(Self { engine, config, tokens, geocoder, mailer, publish_lock: Mutex::new(()) })
    }

    /// Opens the journal under `config.data_dir` and loads the geocoder table, if any.
    ///
    /// # Errors
    /// Journal, index or geocoder file failures.
    pub fn open(config: AppConfig) -> Result<Self, DbError> {
        let engine = Engine::open(&config.data_dir)?;
        let geocoder = match &config.geocoder_file {
            Some(path) => {
                let g = StaticGeocoder::from_file(path)?;
                log::info!("geocoder: {} places from {}", g.len(), path.display());
                g
            }
            None => {
                log::warn!("no geocoder_file configured; bootcamp locations stay unresolved");
                StaticGeocoder::default()
            }
        };
        Self::new(engine, config, Box::new(geocoder), Box::new(LogMailer))
    }

    #[must_use]
    pub fn page_defaults(&self) -> PageDefaults {
        PageDefaults { default_limit: self.config.default_limit, max_limit: self.config.max_limit }
    }
}
