use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Claims of an access token, as far as this library cares about them.
///
/// These are decoded WITHOUT verifying the token signature. Use them for display purposes
/// (greeting the user by name) only. Any authorization decision must be made by a resource server
/// that verifies the token.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessTokenClaims {
    /// (sub) Subject identifier.
    pub sub: String,

    /// (exp) Expiration time, in seconds since the unix epoch.
    pub exp: i64,

    /// (iat) Issuing time, in seconds since the unix epoch.
    pub iat: Option<i64>,

    pub email: Option<String>,

    pub name: Option<String>,

    pub preferred_username: Option<String>,

    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}

impl AccessTokenClaims {
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .inspect_err(|err| tracing::warn!(?err, "Token contained a non-parsable 'exp' value."))
            .ok()
    }

    pub fn to_user(&self) -> User {
        User {
            sub: self.sub.clone(),
            email: self.email.clone(),
            name: self
                .name
                .clone()
                .or_else(|| self.preferred_username.clone()),
        }
    }
}

/// The authenticated user, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub sub: String,
    pub email: Option<String>,
    /// Full name, falling back to the preferred username.
    pub name: Option<String>,
}
