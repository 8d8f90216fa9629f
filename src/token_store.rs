use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::response::TokenResponse;
use crate::storage::{KeyValueStorage, MemoryStorage, WebStorage};
use crate::token_claims::AccessTokenClaims;
use crate::{AccessToken, RefreshToken, token_validation};

pub const ACCESS_TOKEN_KEY: &str = "access-token";
pub const REFRESH_TOKEN_KEY: &str = "refresh-token";

/// Written by earlier, stateful versions of the login flow. Only ever removed.
pub const LEGACY_STATE_KEY: &str = "state";
pub const LEGACY_CODE_VERIFIER_KEY: &str = "code-verifier";

#[derive(Debug, Clone, PartialEq, Eq)]
struct StorageKeys {
    access_token: String,
    refresh_token: String,
    legacy_state: String,
    legacy_code_verifier: String,
}

impl StorageKeys {
    fn new(prefix: &str) -> Self {
        Self {
            access_token: format!("{prefix}{ACCESS_TOKEN_KEY}"),
            refresh_token: format!("{prefix}{REFRESH_TOKEN_KEY}"),
            legacy_state: format!("{prefix}{LEGACY_STATE_KEY}"),
            legacy_code_verifier: format!("{prefix}{LEGACY_CODE_VERIFIER_KEY}"),
        }
    }

    fn all(&self) -> [&str; 4] {
        [
            &self.access_token,
            &self.refresh_token,
            &self.legacy_state,
            &self.legacy_code_verifier,
        ]
    }
}

/// Durable home of the access and refresh token.
///
/// Tokens are read from and written to the `durable` storage (`localStorage` in the browser).
/// Clearing also wipes the `session` storage (`sessionStorage`), where older versions kept data.
///
/// There is no locking beyond what the backends do: two tabs refreshing at the same time may
/// overwrite each other's tokens, which is accepted.
#[derive(Clone)]
pub struct TokenStore {
    durable: Arc<dyn KeyValueStorage>,
    session: Arc<dyn KeyValueStorage>,
    keys: StorageKeys,
}

impl Debug for TokenStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(
        durable: Arc<dyn KeyValueStorage>,
        session: Arc<dyn KeyValueStorage>,
        key_prefix: &str,
    ) -> Self {
        Self {
            durable,
            session,
            keys: StorageKeys::new(key_prefix),
        }
    }

    /// Backed by `window.localStorage` and `window.sessionStorage`.
    pub fn browser(key_prefix: &str) -> Self {
        Self::new(
            Arc::new(WebStorage::local()),
            Arc::new(WebStorage::session()),
            key_prefix,
        )
    }

    pub fn in_memory(key_prefix: &str) -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
            key_prefix,
        )
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.durable.get(&self.keys.access_token)
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.durable.get(&self.keys.refresh_token)
    }

    /// Persist a token response. A response without a refresh token keeps the stored one.
    pub fn store(&self, tokens: &TokenResponse) {
        self.durable
            .set(&self.keys.access_token, &tokens.access_token);
        if let Some(refresh_token) = &tokens.refresh_token {
            self.durable.set(&self.keys.refresh_token, refresh_token);
        }
        tracing::trace!(
            has_refresh_token = tokens.refresh_token.is_some(),
            "Stored tokens"
        );
    }

    /// Remove all tokens and legacy login state from both backends.
    pub fn clear(&self) {
        for key in self.keys.all() {
            self.durable.remove(key);
            self.session.remove(key);
        }
        tracing::trace!("Cleared all stored tokens");
    }

    pub fn clear_legacy_keys(&self) {
        for key in [&self.keys.legacy_state, &self.keys.legacy_code_verifier] {
            self.durable.remove(key);
            self.session.remove(key);
        }
    }

    /// Claims of the stored access token, if there is one that decodes.
    pub fn access_token_claims(&self) -> Option<AccessTokenClaims> {
        let access_token = self.access_token()?;
        token_validation::decode_unverified(&access_token)
            .inspect_err(|err| tracing::debug!(?err, "Stored access token does not decode."))
            .ok()
    }

    /// Whether a stored access token exists and outlives `now + buffer`.
    pub fn is_authenticated(&self, now: OffsetDateTime, buffer: Duration) -> bool {
        match self.access_token() {
            Some(access_token) => {
                token_validation::is_access_token_valid(&access_token, now, buffer)
            }
            None => false,
        }
    }
}
