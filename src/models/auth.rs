use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::user::{Role, Session, UserSummary};

/// Claims embedded in the access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Decoded, checked contents of a credential.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPayload {
    pub subject: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: Option<String>,
    pub session_id: String,
    pub expires_at: i64,
    pub issued_at: i64,
}

impl From<Claims> for TokenPayload {
    fn from(c: Claims) -> Self {
        Self {
            subject: c.sub,
            email: c.email,
            role: c.role.unwrap_or(Role::User),
            display_name: c.name,
            session_id: c.sid,
            expires_at: c.exp,
            issued_at: c.iat,
        }
    }
}

impl TokenPayload {
    pub fn into_session(self) -> Option<Session> {
        let expires_at: DateTime<Utc> = Utc.timestamp_opt(self.expires_at, 0).single()?;
        Some(Session {
            user: UserSummary {
                id: self.subject,
                email: self.email,
                role: self.role,
                display_name: self.display_name,
            },
            session_id: self.session_id,
            expires_at,
        })
    }
}

/// Outcome of validating a credential. `payload` is `Some` iff `valid`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenValidation {
    pub valid: bool,
    pub payload: Option<TokenPayload>,
}

impl TokenValidation {
    pub fn invalid() -> Self {
        Self { valid: false, payload: None }
    }

    pub fn valid(payload: TokenPayload) -> Self {
        Self { valid: true, payload: Some(payload) }
    }
}
