use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    User,
    Host,
    Agency,
    Admin,
}

impl Role {
    /// Whether a session holding `self` may open a view that requires `required`.
    ///
    /// Admin satisfies everything, any signed-in non-guest satisfies `User`,
    /// every other requirement needs an exact match (`Host` and `Agency` are peers).
    pub fn satisfies(self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::Guest, Role::Guest) => true,
            (Role::Guest, _) => false,
            (_, Role::User) | (_, Role::Guest) => true,
            (held, required) => held == required,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Host => "host",
            Role::Agency => "agency",
            Role::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "host" => Ok(Role::Host),
            "agency" => Ok(Role::Agency),
            "admin" => Ok(Role::Admin),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// What the front-ends know about the signed-in user.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Request-scoped view of an authenticated user. Only built from a validated,
/// unexpired credential (see `services::session`).
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserSummary,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

// Response DTOs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiring_soon: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: Option<String>,
}
