use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use schemars::JsonSchema;
use uuid::Uuid;

/// Session row. Tokens are kept only as SHA-256 digests.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_access_token_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.access_token_expires_at
    }

    pub fn is_refresh_token_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.refresh_token_expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub access_token_hash: String,
    pub refresh_token_hash: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// A freshly persisted session together with the plaintext tokens handed to
/// the client. The plaintext exists nowhere else.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: crate::models::user::UserResponse,
}

#[derive(Serialize, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}
