use std::env;

use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{User, UserRole};
use crate::error::{ApiError, Error};

use super::permissions::ActionType;

const SESSION_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub public_id: uuid::Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user: &User) -> Self {
        Self::with_lifetime(user, Duration::hours(SESSION_LIFETIME_HOURS))
    }

    fn with_lifetime(user: &User, lifetime: Duration) -> Self {
        let now = Local::now();

        Self {
            user_id: user.id,
            public_id: user.public_id,
            username: user.username.to_owned(),
            role: user.role.to_owned(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub public_id: uuid::Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(&self) {
            return Err(
                ApiError::Unauthorized.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            user_id: self.user_id,
            public_id: self.public_id,
            username: self.username,
            is_admin: self.role == UserRole::Admin,
            role: self.role,
        }
    }
}

fn signing_key() -> Result<Hmac<Sha256>, Error> {
    let secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
        log::warn!("JWT_SECRET not set, using development default");
        String::from("development-secret")
    });

    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::InternalServerError.new("Invalid signing key"))
}

pub fn generate_jwt_session(user: &User) -> Result<String, Error> {
    let key = signing_key()?;
    let claims = JwtSessionData::new(user);

    claims
        .sign_with_key(&key)
        .map_err(|_| ApiError::InternalServerError.new("Failed to sign session token"))
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, Error> {
    let key = signing_key()?;

    token
        .verify_with_key(&key)
        .map_err(|_| ApiError::InvalidSession.new("Invalid session; Invalid token"))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(ApiError::InvalidSession.new("Invalid session; Token expired"));
            }
            return Ok(session);
        })?
}
