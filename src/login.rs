use itertools::Itertools;
use snafu::ResultExt;
use url::Url;

use crate::AuthorizationEndpoint;
use crate::code_verifier::{self, PkceChallenge};
use crate::config::UsePkceAuthOptions;
use crate::endpoints::Endpoints;
use crate::error::{AuthError, InvalidConfigSnafu, PkceSnafu};
use crate::state_token::StateToken;

/// Everything needed to send the user to the authorization server.
///
/// Building one has no side effects. In particular, nothing is written to storage: the code
/// verifier only exists inside `state`, which makes concurrent logins from several tabs safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: StateToken,
}

/// Start a fresh login attempt: new PKCE pair, new nonce, new url.
pub fn generate_authorization_request(
    options: &UsePkceAuthOptions,
) -> Result<AuthorizationRequest, AuthError> {
    let pkce = code_verifier::generate_challenge(options.advanced.code_verifier_length)
        .context(PkceSnafu {})?;
    build_authorization_request(options, &pkce)
}

pub fn build_authorization_request(
    options: &UsePkceAuthOptions,
    pkce: &PkceChallenge,
) -> Result<AuthorizationRequest, AuthError> {
    let endpoints = Endpoints::derive(&options.auth_server_url).context(InvalidConfigSnafu {})?;
    let state = StateToken::new(
        pkce.code_verifier.clone(),
        options.advanced.state_nonce_length,
    );
    let url = create_login_url(
        endpoints.authorization,
        pkce,
        &state,
        &options.client_id,
        options.redirect_uri.as_str(),
        &normalize_scope(&options.scope),
    );
    tracing::trace!(%url, "Created login url");
    Ok(AuthorizationRequest { url, state })
}

fn create_login_url(
    authorization_endpoint: AuthorizationEndpoint,
    pkce: &PkceChallenge,
    state: &StateToken,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
) -> Url {
    let mut login_url: Url = authorization_endpoint;
    login_url
        .query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scope)
        .append_pair("state", &state.encode())
        .append_pair("code_challenge", pkce.code_challenge.code_challenge())
        .append_pair(
            "code_challenge_method",
            pkce.code_challenge.code_challenge_method().as_str(),
        );
    login_url
}

/// Collapse whitespace and make sure `openid` is requested.
fn normalize_scope(scope: &str) -> String {
    let scopes = scope.split_whitespace().unique().collect::<Vec<_>>();
    match scopes.contains(&"openid") {
        true => scopes.into_iter().join(" "),
        false => std::iter::once("openid").chain(scopes).join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random;
    use assertr::prelude::*;
    use std::collections::HashMap;

    fn options() -> UsePkceAuthOptions {
        UsePkceAuthOptions::new(
            Url::parse("https://id.example.com/realms/bodhi/").unwrap(),
            "webchat",
            Url::parse("http://localhost:3000/auth").unwrap(),
        )
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn login_url_carries_all_parameters() {
        let pkce = code_verifier::generate_challenge(128).unwrap();
        let request = build_authorization_request(&options(), &pkce).unwrap();

        assert_that(request.url.path()).is_equal_to("/realms/bodhi/protocol/openid-connect/auth");

        let query = query(&request.url);
        assert_that(query.len()).is_equal_to(7);
        assert_that(query["response_type"].as_str()).is_equal_to("code");
        assert_that(query["client_id"].as_str()).is_equal_to("webchat");
        assert_that(query["redirect_uri"].as_str()).is_equal_to("http://localhost:3000/auth");
        assert_that(query["scope"].as_str()).is_equal_to("openid email profile roles");
        assert_that(query["code_challenge"].as_str())
            .is_equal_to(pkce.code_challenge.code_challenge());
        assert_that(query["code_challenge_method"].as_str()).is_equal_to("S256");
        assert_that(query["state"].clone()).is_equal_to(request.state.encode());
    }

    #[test]
    fn state_carries_the_code_verifier() {
        let pkce = code_verifier::generate_challenge(64).unwrap();
        let request = build_authorization_request(&options(), &pkce).unwrap();

        let state = query(&request.url)["state"].clone();
        let (nonce, encoded_verifier) = state.split_once('.').unwrap();
        assert_that(nonce.len() >= 32).is_true();
        assert_that(random::base64url_decode(encoded_verifier).unwrap())
            .is_equal_to(pkce.code_verifier.code_verifier().as_bytes().to_vec());
    }

    #[test]
    fn each_request_uses_a_new_nonce() {
        let pkce = code_verifier::generate_challenge(64).unwrap();
        let a = build_authorization_request(&options(), &pkce).unwrap();
        let b = build_authorization_request(&options(), &pkce).unwrap();
        assert_that(a.state.nonce() != b.state.nonce()).is_true();
    }

    #[test]
    fn generated_requests_respect_configured_verifier_length() {
        let mut options = options();
        options.advanced.code_verifier_length = 43;
        let request = generate_authorization_request(&options).unwrap();
        assert_that(request.state.code_verifier().code_verifier()).has_length(43);

        options.advanced.code_verifier_length = 200;
        let err = generate_authorization_request(&options).unwrap_err();
        assert_that(matches!(err, AuthError::Pkce { .. })).is_true();
    }

    #[test]
    fn scope_always_contains_openid() {
        assert_that(normalize_scope("email  profile")).is_equal_to("openid email profile".to_owned());
        assert_that(normalize_scope(" openid email ")).is_equal_to("openid email".to_owned());
        assert_that(normalize_scope("")).is_equal_to("openid".to_owned());
        assert_that(normalize_scope("email email")).is_equal_to("openid email".to_owned());
    }
}
