use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::code_verifier::{self, DEFAULT_CODE_VERIFIER_LENGTH, PkceError};
use crate::state_token::MIN_STATE_NONCE_LENGTH;

/// Scopes requested when none are configured explicitly.
pub const DEFAULT_SCOPE: &str = "openid email profile roles";

/// Prefix of every key this library writes to browser storage.
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "webchat-";

/// Parameters required to authenticate against a single authorization server.
///
/// Can be deserialized, for example from a JSON document served alongside the application.
/// Only `auth_server_url`, `client_id` and `redirect_uri` are required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UsePkceAuthOptions {
    /// Url of the realm on your authorization server, e.g. "https://id.example.com/realms/my-realm".
    /// All endpoints are derived from it. A trailing slash is ignored.
    pub auth_server_url: Url,

    /// The public client as registered with the authorization server.
    pub client_id: String,

    /// Url the authorization server redirects to after login. This is where `AuthCallback` is
    /// rendered. Must match the redirect URI registered for the client.
    pub redirect_uri: Url,

    /// Space-delimited scopes. `openid` is always requested, even if missing here.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Path navigated to after a successful login.
    #[serde(default = "default_post_login_path")]
    pub post_login_path: String,

    /// Path navigated to after logout.
    #[serde(default = "default_post_logout_path")]
    pub post_logout_path: String,

    #[serde(default)]
    pub advanced: AdvancedOptions,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_owned()
}

fn default_post_login_path() -> String {
    "/chat".to_owned()
}

fn default_post_logout_path() -> String {
    "/".to_owned()
}

impl UsePkceAuthOptions {
    pub fn new(auth_server_url: Url, client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            auth_server_url,
            client_id: client_id.into(),
            redirect_uri,
            scope: default_scope(),
            post_login_path: default_post_login_path(),
            post_logout_path: default_post_logout_path(),
            advanced: AdvancedOptions::default(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PkceError> {
        code_verifier::check_length(self.advanced.code_verifier_length)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdvancedOptions {
    /// Length of generated PKCE code verifiers. Must be within 43..=128.
    /// Defaults to `128`.
    pub code_verifier_length: usize,

    /// Length of the anti-CSRF nonce in the `state` parameter. Values below 32 are raised to 32.
    /// Defaults to `32`.
    pub state_nonce_length: usize,

    /// An access token expiring within this duration already counts as expired. This avoids
    /// issuing requests with a token the server rejects in transit.
    /// Defaults to `time::Duration::seconds(30)`.
    pub expiry_buffer: time::Duration,

    /// Upper bound for any request against the token or revocation endpoint.
    /// Defaults to `Duration::from_secs(15)`.
    pub request_timeout: Duration,

    /// Interval after which the access token should be checked for its age.
    /// Defaults to `Duration::from_secs(1)`.
    pub access_token_age_check_interval: Duration,

    /// Prefix of every storage key, e.g. `webchat-access-token`.
    /// Defaults to `"webchat-"`.
    pub storage_key_prefix: String,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            code_verifier_length: DEFAULT_CODE_VERIFIER_LENGTH,
            state_nonce_length: MIN_STATE_NONCE_LENGTH,
            expiry_buffer: time::Duration::seconds(30),
            request_timeout: Duration::from_secs(15),
            access_token_age_check_interval: Duration::from_secs(1),
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_owned(),
        }
    }
}
