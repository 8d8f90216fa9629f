use std::time::Duration;

use snafu::{OptionExt, ResultExt};
use url::Url;

use crate::config::UsePkceAuthOptions;
use crate::endpoints::Endpoints;
use crate::error::{
    AuthError, InvalidConfigSnafu, InvalidStateSnafu, NoRefreshTokenSnafu, TokenOperation,
};
use crate::request;
use crate::response::TokenResponse;
use crate::state_token::StateToken;
use crate::token_store::TokenStore;

/// Talks to the token and revocation endpoint of the configured authorization server and keeps
/// the [`TokenStore`] in sync with the results.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    client_id: String,
    redirect_uri: Url,
    timeout: Duration,
    store: TokenStore,
}

impl TokenClient {
    pub fn new(
        options: &UsePkceAuthOptions,
        http: reqwest::Client,
        store: TokenStore,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            http,
            endpoints: Endpoints::derive(&options.auth_server_url).context(InvalidConfigSnafu {})?,
            client_id: options.client_id.clone(),
            redirect_uri: options.redirect_uri.clone(),
            timeout: options.advanced.request_timeout,
            store,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Exchange an authorization `code` for tokens, using the code verifier carried in `state`.
    ///
    /// A malformed `state` fails before any request is sent.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
    ) -> Result<TokenResponse, AuthError> {
        let code_verifier = StateToken::parse(state)
            .context(InvalidStateSnafu {})?
            .into_code_verifier();

        // Nothing reads these anymore, but earlier versions left them behind.
        self.store.clear_legacy_keys();

        tracing::trace!("Exchanging authorization code for tokens");
        let tokens = request::exchange_code_for_token(
            &self.http,
            &self.endpoints.token,
            &self.client_id,
            self.redirect_uri.as_str(),
            code,
            code_verifier.code_verifier(),
            self.timeout,
        )
        .await
        .map_err(|err| AuthError::from_request(TokenOperation::CodeExchange, err))?;

        self.store.store(&tokens);
        tracing::debug!("Authorization code exchanged");
        Ok(tokens)
    }

    /// Trade the stored refresh token for a new set of tokens.
    ///
    /// Any failure response clears all stored tokens. The user has to log in again then, instead
    /// of us retrying with a refresh token the server already rejected.
    pub async fn refresh(&self) -> Result<TokenResponse, AuthError> {
        let refresh_token = self.store.refresh_token().context(NoRefreshTokenSnafu)?;

        tracing::trace!("Refreshing tokens");
        match request::refresh_token(
            &self.http,
            &self.endpoints.token,
            &self.client_id,
            &refresh_token,
            self.timeout,
        )
        .await
        {
            Ok(tokens) => {
                self.store.store(&tokens);
                tracing::debug!("Tokens refreshed");
                Ok(tokens)
            }
            Err(err) => {
                if err.status().is_some() {
                    tracing::debug!(?err, "Refresh was rejected. Dropping all tokens.");
                    self.store.clear();
                }
                Err(AuthError::from_request(TokenOperation::Refresh, err))
            }
        }
    }

    /// Best-effort revocation of `refresh_token`.
    ///
    /// Does not touch the store, so callers can forget the token locally first.
    /// Never fails. Should the authorization server not be reachable, the token simply expires.
    pub async fn revoke(&self, refresh_token: &str) {
        let result = request::revoke_token(
            &self.http,
            &self.endpoints.revocation,
            &self.client_id,
            refresh_token,
            self.timeout,
        )
        .await;

        match result {
            Ok(()) => tracing::debug!("Refresh token revoked"),
            Err(err) => {
                let err = AuthError::from_request(TokenOperation::Revocation, err);
                tracing::warn!(?err, "Could not revoke refresh token. Ignoring.");
            }
        }
    }
}
