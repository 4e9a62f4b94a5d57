#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use devcamper::config::{AppConfig, ConfigLayer};
use devcamper::engine::Engine;
use devcamper::geo::{PlaceEntry, StaticGeocoder};
use devcamper::mail::{MailError, Mailer, Message};
use devcamper::{AppState, SharedState};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub fn place(zipcode: &str, city: &str, state: &str, latitude: f64, longitude: f64) -> PlaceEntry {
    PlaceEntry {
        zipcode: zipcode.into(),
        street: String::new(),
        city: city.into(),
        state: state.into(),
        country: "US".into(),
        latitude,
        longitude,
        formatted_address: String::new(),
    }
}

pub fn geocoder() -> StaticGeocoder {
    StaticGeocoder::new(vec![
        place("02118", "Boston", "MA", 42.3396, -71.0706),
        place("02215", "Boston", "MA", 42.3470, -71.1027),
        place("01720", "Acton", "MA", 42.4851, -71.4328),
        place("90210", "Beverly Hills", "CA", 34.0901, -118.4065),
    ])
}

/// Records every message; optionally refuses delivery.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    pub sent: Arc<Mutex<Vec<Message>>>,
    pub fail: bool,
}

impl Mailer for Outbox {
    fn send(&self, message: &Message) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError("smtp down".into()));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

pub fn config(upload_dir: &std::path::Path) -> AppConfig {
    AppConfig::from_layer(ConfigLayer {
        jwt_secret: Some("integration-secret".into()),
        file_upload_path: Some(upload_dir.to_path_buf()),
        max_file_upload: Some(1024),
        ..ConfigLayer::default()
    })
}

pub struct TestApp {
    pub state: SharedState,
    pub outbox: Outbox,
    pub uploads: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_outbox(Outbox::default())
    }

    pub fn with_outbox(outbox: Outbox) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let state = AppState::new(
            Engine::in_memory(),
            config(uploads.path()),
            Box::new(geocoder()),
            Box::new(outbox.clone()),
        )
        .unwrap();
        Self { state: Arc::new(state), outbox, uploads }
    }

    pub fn router(&self) -> Router {
        devcamper::router(self.state.clone())
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let res = self.router().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, headers, body)
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request(method, uri, token, body)).await;
        (status, body)
    }

    /// Registers a user and returns its bearer token.
    pub async fn register(&self, name: &str, email: &str, role: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({"name": name, "email": email, "password": "123456", "role": role})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Seeds an admin directly through the model layer and logs it in.
    pub async fn admin(&self) -> String {
        use devcamper::auth::password::hash_password;
        use devcamper::models::{self, Role, User, UserInput};
        let input = UserInput {
            name: Some("Admin".into()),
            email: Some("admin@devcamper.io".into()),
            password: Some("123456".into()),
            role: None,
        };
        let user = User::new(&input, Role::Admin, hash_password("123456").unwrap());
        models::create(&self.state.engine, &user).unwrap();
        self.state.tokens.issue(&user.id).unwrap()
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str, zipcode: &str, careers: &[&str]) -> String {
        let (status, body) = self
            .call(Method::POST, "/api/v1/bootcamps", Some(token), Some(bootcamp_body(name, zipcode, careers)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["_id"].as_str().unwrap().to_string()
    }
}

pub fn bootcamp_body(name: &str, zipcode: &str, careers: &[&str]) -> Value {
    json!({
        "name": name,
        "description": format!("{name} is a full stack bootcamp"),
        "website": "https://devworks.com",
        "phone": "(111) 111-1111",
        "email": "enroll@devworks.com",
        "address": format!("233 Bay State Rd Boston MA {zipcode}"),
        "careers": careers,
        "housing": true,
        "jobAssistance": true,
    })
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
