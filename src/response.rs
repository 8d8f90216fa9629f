use leptos_router::params::{Params, ParamsError, ParamsMap};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{AccessToken, AuthorizationCode, RefreshToken};

/// Successful response of the token endpoint, for both the `authorization_code` and the
/// `refresh_token` grant.
///
/// See [RFC 6749 Section 5.1](https://datatracker.ietf.org/doc/html/rfc6749#section-5.1).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: AccessToken,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    /// Servers may omit this on refresh. The previously stored refresh token stays valid then.
    pub refresh_token: Option<RefreshToken>,
    pub refresh_expires_in: Option<i64>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    #[serde(rename = "not-before-policy")]
    pub not_before_policy: Option<i64>,
    pub session_state: Option<String>,
}

/// See [RFC 6749 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6749#section-5.2) for details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum KnownOidcErrorCode {
    #[serde(rename = "invalid_request")]
    InvalidRequest,

    #[serde(rename = "invalid_client")]
    InvalidClient,

    /// The provided authorization grant or refresh token is invalid, expired, revoked, does not
    /// match the redirection URI used in the authorization request, or was issued to another client.
    #[serde(rename = "invalid_grant")]
    InvalidGrant,

    #[serde(rename = "unauthorized_client")]
    UnauthorizedClient,

    #[serde(rename = "unsupported_grant_type")]
    UnsupportedGrantType,

    #[serde(rename = "invalid_scope")]
    InvalidScope,

    /// Authorization endpoint only: the resource owner or authorization server denied the request.
    #[serde(rename = "access_denied")]
    AccessDenied,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OidcErrorCode {
    Known(KnownOidcErrorCode),
    Unknown(String),
}

/// OAuth error response body, as returned by the token and revocation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: OidcErrorCode,
    pub error_description: Option<String>,
    pub error_uri: Option<String>,
}

impl ErrorResponse {
    /// Any `invalid_grant` means that the code or refresh token we sent is no longer usable.
    pub fn is_invalid_grant(&self) -> bool {
        self.error == OidcErrorCode::Known(KnownOidcErrorCode::InvalidGrant)
    }
}

/// Query parameters the authorization server appends to our `redirect_uri`.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallbackParams {
    pub code: Option<AuthorizationCode>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Identity of one authorization response. Handling is deduplicated on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackKey {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match &*key {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            *slot = non_empty(value.into_owned());
        }
        params
    }

    pub fn key(&self) -> CallbackKey {
        CallbackKey {
            code: self.code.clone(),
            state: self.state.clone(),
            error: self.error.clone(),
        }
    }

    /// Whether this looks like a redirect from the authorization server at all.
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.state.is_none() && self.error.is_none()
    }
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|it| !it.is_empty())
}

/// Never fails: missing parameters are a state the callback handler reports itself.
impl Params for CallbackParams {
    fn from_map(map: &ParamsMap) -> Result<Self, ParamsError> {
        Ok(CallbackParams {
            code: map.get("code").and_then(non_empty),
            state: map.get("state").and_then(non_empty),
            error: map.get("error").and_then(non_empty),
            error_description: map.get("error_description").and_then(non_empty),
        })
    }
}
