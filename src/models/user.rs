use super::fields::{
    Violations, get_datetime, get_oid, get_opt_string, get_string, insert_opt, is_email,
    to_bson_datetime,
};
use super::Model;
use crate::errors::DbError;
use bson::oid::ObjectId;
use bson::{Document as BsonDocument, doc};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "publisher" => Some(Self::Publisher),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Publisher => "publisher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Argon2 PHC string.
    pub password: String,
    pub reset_password_token: Option<String>,
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

fn check_identity(v: &mut Violations, name: &str, email: &str) {
    v.required(name, "Please add a name");
    if email.trim().is_empty() {
        v.check(false, "Please add an email");
    } else {
        v.check(is_email(email), "Please add a valid email");
    }
}

impl UserInput {
    /// Checks a new account before its password is hashed and returns the granted role.
    /// `admin` is only grantable when `allow_admin` is set.
    ///
    /// # Errors
    /// `DbError::Validation` listing every violated rule.
    pub fn check_new(&self, allow_admin: bool) -> Result<Role, DbError> {
        let mut v = Violations::default();
        check_identity(&mut v, self.name.as_deref().unwrap_or(""), self.email.as_deref().unwrap_or(""));
        let role = self.check_role(&mut v, allow_admin);
        match self.password.as_deref() {
            None | Some("") => v.check(false, "Please add a password"),
            Some(p) => v.check(
                p.chars().count() >= MIN_PASSWORD_LEN,
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ),
        }
        v.into_result()?;
        Ok(role)
    }

    fn check_role(&self, v: &mut Violations, allow_admin: bool) -> Role {
        match self.role.as_deref() {
            None => Role::User,
            Some(raw) => match Role::parse(raw) {
                Some(Role::Admin) if !allow_admin => {
                    v.check(false, "`admin` is not a valid role");
                    Role::User
                }
                Some(role) => role,
                None => {
                    v.check(false, format!("`{raw}` is not a valid role"));
                    Role::User
                }
            },
        }
    }
}

impl User {
    #[must_use]
    pub fn new(input: &UserInput, role: Role, password_hash: String) -> Self {
        Self {
            id: ObjectId::new(),
            name: input.name.as_deref().unwrap_or_default().trim().to_string(),
            email: input.email.as_deref().unwrap_or_default().trim().to_lowercase(),
            role,
            password: password_hash,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    /// Admin-side update of name, email and role; the password is never taken from here.
    ///
    /// # Errors
    /// `DbError::Validation` for an unknown role.
    pub fn apply(&mut self, input: &UserInput) -> Result<(), DbError> {
        let mut v = Violations::default();
        let role = input.role.as_ref().map(|_| input.check_role(&mut v, true));
        v.into_result()?;
        if let Some(name) = &input.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = &input.email {
            self.email = email.trim().to_lowercase();
        }
        if let Some(role) = role {
            self.role = role;
        }
        Ok(())
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}

impl Model for User {
    const COLLECTION: &'static str = "users";
    const HIDDEN: &'static [&'static str] = &["password", "resetPasswordToken", "resetPasswordExpire"];

    fn id(&self) -> ObjectId {
        self.id
    }

    fn to_document(&self) -> BsonDocument {
        let mut d = doc! {
            "_id": self.id,
            "name": self.name.as_str(),
            "email": self.email.as_str(),
            "role": self.role.as_str(),
            "password": self.password.as_str(),
        };
        insert_opt(&mut d, "resetPasswordToken", self.reset_password_token.as_deref());
        insert_opt(&mut d, "resetPasswordExpire", self.reset_password_expire.as_ref().map(to_bson_datetime));
        d.insert("createdAt", to_bson_datetime(&self.created_at));
        d
    }

    fn from_document(d: &BsonDocument) -> Result<Self, DbError> {
        let role = get_string(d, "role");
        Ok(Self {
            id: get_oid(d, "_id")?,
            name: get_string(d, "name"),
            email: get_string(d, "email"),
            role: Role::parse(&role)
                .ok_or_else(|| DbError::invalid(format!("`{role}` is not a valid role")))?,
            password: get_string(d, "password"),
            reset_password_token: get_opt_string(d, "resetPasswordToken"),
            reset_password_expire: get_datetime(d, "resetPasswordExpire"),
            created_at: get_datetime(d, "createdAt").unwrap_or_else(Utc::now),
        })
    }

    fn validate(&self) -> Result<(), DbError> {
        let mut v = Violations::default();
        check_identity(&mut v, &self.name, &self.email);
        v.required(&self.password, "Please add a password");
        v.into_result()
    }
}
