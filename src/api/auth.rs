use super::error::ApiError;
use super::extract::JsonBody;
use super::response::{clear_token_response, model_json, ok, token_response};
use crate::auth::Principal;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::reset;
use crate::mail::Message;
use crate::models::user::MIN_PASSWORD_LEN;
use crate::models::{self, User, UserInput};
use crate::query::{CmpOp, Filter};
use crate::state::SharedState;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post, put};
use serde::Deserialize;
use serde_json::json;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/me", get(me))
        .route("/auth/updatedetails", put(update_details))
        .route("/auth/updatepassword", put(update_password))
        .route("/auth/forgotpassword", post(forgot_password))
        .route("/auth/resetpassword/:resettoken", put(reset_password))
}

#[derive(Debug, Default, Deserialize)]
struct LoginInput {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailsInput {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailInput {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NewPassword {
    password: Option<String>,
}

fn check_password(password: Option<&str>) -> Result<&str, ApiError> {
    match password {
        None | Some("") => Err(ApiError::BadRequest("Please add a password".into())),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ))),
        Some(p) => Ok(p),
    }
}

/// Runs `f` on the blocking pool.
pub(super) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

pub(super) async fn hash_off_thread(plain: &str) -> Result<String, ApiError> {
    let plain = plain.to_owned();
    Ok(blocking(move || hash_password(&plain)).await??)
}

async fn verify_off_thread(plain: String, phc: String) -> Result<bool, ApiError> {
    blocking(move || verify_password(&plain, &phc)).await
}

fn find_by_email(state: &SharedState, email: &str) -> Result<Option<User>, ApiError> {
    let email = email.trim().to_lowercase();
    Ok(models::find_one(&state.engine, &Filter::eq("email", email))?)
}

/// Self-registration; `admin` cannot be requested here.
async fn register(
    State(state): State<SharedState>,
    JsonBody(input): JsonBody<UserInput>,
) -> Result<Response, ApiError> {
    let role = input.check_new(false)?;
    let hash = hash_off_thread(input.password.as_deref().unwrap_or_default()).await?;
    let user = User::new(&input, role, hash);
    models::create(&state.engine, &user)?;
    log::info!("registered user {} as {}", user.id, user.role);
    token_response(&state, &user, StatusCode::OK)
}

async fn login(
    State(state): State<SharedState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (
        input.email.filter(|e| !e.trim().is_empty()),
        input.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Please provide an email and password".into()));
    };
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());
    let user = find_by_email(&state, &email)?.ok_or_else(invalid)?;
    if !verify_off_thread(password, user.password.clone()).await? {
        log::debug!("failed login for {}", user.id);
        return Err(invalid());
    }
    token_response(&state, &user, StatusCode::OK)
}

async fn logout() -> Result<Response, ApiError> {
    clear_token_response()
}

async fn me(Principal(user): Principal) -> Response {
    ok(model_json(&user))
}

async fn update_details(
    State(state): State<SharedState>,
    Principal(mut user): Principal,
    JsonBody(input): JsonBody<DetailsInput>,
) -> Result<Response, ApiError> {
    user.apply(&UserInput { name: input.name, email: input.email, ..UserInput::default() })?;
    models::save(&state.engine, &user)?;
    Ok(ok(model_json(&user)))
}

async fn update_password(
    State(state): State<SharedState>,
    Principal(mut user): Principal,
    JsonBody(input): JsonBody<PasswordChange>,
) -> Result<Response, ApiError> {
    let current = input.current_password.unwrap_or_default();
    if !verify_off_thread(current, user.password.clone()).await? {
        return Err(ApiError::Unauthorized("Password is incorrect".into()));
    }
    user.password = hash_off_thread(check_password(input.new_password.as_deref())?).await?;
    models::save(&state.engine, &user)?;
    token_response(&state, &user, StatusCode::OK)
}

/// Stores a hashed reset token and mails the raw one inside a reset URL.
async fn forgot_password(
    State(state): State<SharedState>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<EmailInput>,
) -> Result<Response, ApiError> {
    let email = input.email.unwrap_or_default();
    let mut user = find_by_email(&state, &email)?
        .ok_or_else(|| ApiError::NotFound("There is no user with that email".into()))?;

    let (raw, hashed, expires) = reset::generate();
    user.reset_password_token = Some(hashed);
    user.reset_password_expire = Some(expires);
    models::save(&state.engine, &user)?;

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map_or_else(|| state.config.bind_addr(), str::to_string);
    let url = format!("http://{host}/api/v1/auth/resetpassword/{raw}");
    let message = Message {
        to: user.email.clone(),
        subject: "Password reset token".into(),
        text: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. Please make a PUT request to: \n\n {url}"
        ),
    };
    if let Err(e) = state.mailer.send(&message) {
        log::error!("reset mail for user {}: {e}", user.id);
        user.clear_reset_token();
        models::save(&state.engine, &user)?;
        return Err(ApiError::Server("Email could not be sent".into()));
    }
    Ok(ok(json!("Email sent")))
}

async fn reset_password(
    State(state): State<SharedState>,
    Path(token): Path<String>,
    JsonBody(input): JsonBody<NewPassword>,
) -> Result<Response, ApiError> {
    let filter = Filter::and(vec![
        Filter::eq("resetPasswordToken", reset::sha256_hex(&token)),
        Filter::Cmp {
            path: "resetPasswordExpire".into(),
            op: CmpOp::Gt,
            value: bson::DateTime::now().into(),
        },
    ]);
    let mut user: User = models::find_one(&state.engine, &filter)?
        .ok_or_else(|| ApiError::BadRequest("Invalid token".into()))?;
    user.password = hash_off_thread(check_password(input.password.as_deref())?).await?;
    user.clear_reset_token();
    models::save(&state.engine, &user)?;
    log::info!("password reset for user {}", user.id);
    token_response(&state, &user, StatusCode::OK)
}
